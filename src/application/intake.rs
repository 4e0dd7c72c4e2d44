use super::dispatcher::NotificationDispatcher;
use super::references;
use crate::domain::caller::Caller;
use crate::domain::contact::{
    ContactStatus, ContactSubmission, NewContact, NewPartnershipInquiry,
};
use crate::domain::notification::Audience;
use crate::domain::ports::{ContactStoreBox, Page, RegistrationStoreBox};
use crate::domain::reference::{
    CONTACT_PREFIX, REGISTRATION_PREFIX, RandomReferences, ReferenceCode, ReferenceSource,
};
use crate::domain::registration::{
    NewRegistration, RegistrationStatus, TRAINING_PROGRAMS, TrainingProgram, TrainingRegistration,
};
use crate::error::{Result, TrackerError};
use chrono::Utc;
use serde::Serialize;
use std::sync::Arc;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct IntakeCounts {
    pub registrations: u64,
    pub contacts: u64,
    pub new_contacts: u64,
}

/// Training sign-ups and contact form messages.
///
/// Neither record has a state machine; operators set their status freely.
pub struct RegistrationDesk {
    registrations: RegistrationStoreBox,
    contacts: ContactStoreBox,
    references: Box<dyn ReferenceSource>,
    dispatcher: Arc<NotificationDispatcher>,
    reference_attempts: u32,
}

impl RegistrationDesk {
    pub fn new(
        registrations: RegistrationStoreBox,
        contacts: ContactStoreBox,
        dispatcher: Arc<NotificationDispatcher>,
        reference_attempts: u32,
    ) -> Self {
        Self {
            registrations,
            contacts,
            references: Box::new(RandomReferences),
            dispatcher,
            reference_attempts,
        }
    }

    pub fn with_reference_source(mut self, references: Box<dyn ReferenceSource>) -> Self {
        self.references = references;
        self
    }

    /// Public training calendar.
    pub fn programs(&self) -> &'static [TrainingProgram] {
        &TRAINING_PROGRAMS
    }

    pub fn program(&self, id: &str) -> Result<&'static TrainingProgram> {
        TRAINING_PROGRAMS
            .iter()
            .find(|program| program.id == id)
            .ok_or_else(|| TrackerError::NotFound(format!("training program {id}")))
    }

    pub async fn register(&self, input: NewRegistration) -> Result<TrainingRegistration> {
        let now = Utc::now();
        let store = self.registrations.as_ref();
        let registration = references::allocate(
            self.references.as_ref(),
            REGISTRATION_PREFIX,
            now.date_naive(),
            self.reference_attempts,
            |reference| {
                let created = TrainingRegistration::create(input.clone(), reference, now);
                async move {
                    let registration = created?;
                    store.insert(registration.clone()).await?;
                    Ok::<_, TrackerError>(registration)
                }
            },
        )
        .await?;

        tracing::info!(
            reference = %registration.reference,
            program = %registration.program_name,
            "training registration received"
        );
        self.dispatcher.dispatch(registration.notifications());
        Ok(registration)
    }

    pub async fn registration(&self, reference: &ReferenceCode) -> Result<TrainingRegistration> {
        self.registrations
            .get_by_reference(reference)
            .await?
            .ok_or_else(|| TrackerError::NotFound(format!("registration {reference}")))
    }

    pub async fn registrations(&self, caller: &Caller) -> Result<Vec<TrainingRegistration>> {
        caller.require_operator("list registrations")?;
        self.registrations.list().await
    }

    pub async fn set_registration_status(
        &self,
        caller: &Caller,
        reference: &ReferenceCode,
        status: RegistrationStatus,
    ) -> Result<TrainingRegistration> {
        caller.require_operator("update registrations")?;
        let mut registration = self.registration(reference).await?;
        registration.status = status;
        registration.updated_at = Utc::now().max(registration.updated_at);
        self.registrations.save(registration.clone()).await?;
        Ok(registration)
    }

    pub async fn submit_contact(&self, input: NewContact) -> Result<ContactSubmission> {
        let contact = self.store_contact(input).await?;
        tracing::info!(
            reference = %contact.reference,
            category = ?contact.category,
            "contact message received"
        );
        self.dispatcher.dispatch(contact.notifications());
        Ok(contact)
    }

    /// Files a partnership inquiry under the contact messages. Only the operator is told.
    pub async fn submit_partnership(
        &self,
        inquiry: NewPartnershipInquiry,
    ) -> Result<ContactSubmission> {
        let contact = self.store_contact(inquiry.into_contact()?).await?;
        tracing::info!(reference = %contact.reference, "partnership inquiry received");
        self.dispatcher.dispatch(vec![contact.intent(Audience::Operator)]);
        Ok(contact)
    }

    async fn store_contact(&self, input: NewContact) -> Result<ContactSubmission> {
        let now = Utc::now();
        let store = self.contacts.as_ref();
        let contact = references::allocate(
            self.references.as_ref(),
            CONTACT_PREFIX,
            now.date_naive(),
            self.reference_attempts,
            |reference| {
                let created = ContactSubmission::create(input.clone(), reference, now);
                async move {
                    let contact = created?;
                    store.insert(contact.clone()).await?;
                    Ok::<_, TrackerError>(contact)
                }
            },
        )
        .await?;
        Ok(contact)
    }

    pub async fn contacts(
        &self,
        caller: &Caller,
        status: Option<ContactStatus>,
        page: u32,
        limit: u32,
    ) -> Result<Page<ContactSubmission>> {
        caller.require_operator("list contact messages")?;
        self.contacts.list(status, page, limit).await
    }

    pub async fn update_contact(
        &self,
        caller: &Caller,
        id: Uuid,
        status: ContactStatus,
        response: Option<String>,
    ) -> Result<ContactSubmission> {
        caller.require_operator("update contact messages")?;
        let mut contact = self
            .contacts
            .get(id)
            .await?
            .ok_or_else(|| TrackerError::NotFound(format!("contact {id}")))?;
        contact.update_status(status, response, Utc::now().max(contact.updated_at));
        self.contacts.save(contact.clone()).await?;
        Ok(contact)
    }

    pub async fn counts(&self, caller: &Caller) -> Result<IntakeCounts> {
        caller.require_operator("view intake statistics")?;
        let registrations = self.registrations.list().await?.len() as u64;
        let contacts = self.contacts.list(None, 1, 1).await?.total;
        let new_contacts = self
            .contacts
            .list(Some(ContactStatus::New), 1, 1)
            .await?
            .total;
        Ok(IntakeCounts {
            registrations,
            contacts,
            new_contacts,
        })
    }
}
