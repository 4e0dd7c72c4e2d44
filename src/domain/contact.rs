use crate::domain::notification::{
    Audience, NotificationEvent, NotificationIntent, NotificationPayload,
};
use crate::domain::reference::ReferenceCode;
use crate::domain::validation;
use crate::error::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Default, Serialize, Deserialize, PartialEq, Eq, Clone, Copy)]
#[serde(rename_all = "kebab-case")]
pub enum ContactCategory {
    #[default]
    General,
    Partnership,
    Services,
    Training,
    Research,
    Other,
}

#[derive(Debug, Default, Serialize, Deserialize, PartialEq, Eq, Hash, Clone, Copy)]
#[serde(rename_all = "kebab-case")]
pub enum ContactStatus {
    #[default]
    New,
    Read,
    Replied,
    Archived,
}

#[derive(Debug, Serialize, Deserialize, PartialEq, Clone)]
pub struct NewContact {
    pub name: String,
    pub email: String,
    pub subject: String,
    pub message: String,
    #[serde(default)]
    pub category: Option<ContactCategory>,
}

/// Partnership form. Stored as a contact message in the `partnership` category.
#[derive(Debug, Serialize, Deserialize, PartialEq, Clone)]
pub struct NewPartnershipInquiry {
    pub name: String,
    pub email: String,
    pub organization: String,
    pub partnership_type: String,
    pub message: String,
}

impl NewPartnershipInquiry {
    /// Checks the partnership fields and folds them into subject and message.
    pub fn into_contact(self) -> Result<NewContact> {
        let organization = validation::non_empty("organization", &self.organization)?;
        let partnership_type = validation::non_empty("partnership_type", &self.partnership_type)?;
        let message = validation::non_empty("message", &self.message)?;
        Ok(NewContact {
            name: self.name,
            email: self.email,
            subject: format!("Partnership Inquiry: {partnership_type}"),
            message: format!(
                "Organization: {organization}\n\nPartnership Type: {partnership_type}\n\n{message}"
            ),
            category: Some(ContactCategory::Partnership),
        })
    }
}

#[derive(Debug, Serialize, Deserialize, PartialEq, Clone)]
pub struct ContactSubmission {
    pub id: Uuid,
    pub reference: ReferenceCode,
    pub name: String,
    pub email: String,
    pub subject: String,
    pub message: String,
    pub category: ContactCategory,
    pub status: ContactStatus,
    pub admin_response: Option<String>,
    pub responded_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ContactSubmission {
    pub fn create(
        input: NewContact,
        reference: ReferenceCode,
        now: DateTime<Utc>,
    ) -> Result<Self> {
        Ok(Self {
            id: Uuid::new_v4(),
            reference,
            name: validation::non_empty("name", &input.name)?,
            email: validation::email("email", &input.email)?,
            subject: validation::non_empty("subject", &input.subject)?,
            message: validation::non_empty("message", &input.message)?,
            category: input.category.unwrap_or_default(),
            status: ContactStatus::New,
            admin_response: None,
            responded_at: None,
            created_at: now,
            updated_at: now,
        })
    }

    /// Moves the submission to `status`. A response stamps `responded_at` the first time.
    pub fn update_status(
        &mut self,
        status: ContactStatus,
        response: Option<String>,
        now: DateTime<Utc>,
    ) {
        self.status = status;
        if let Some(response) = validation::optional(response) {
            self.admin_response = Some(response);
            if self.responded_at.is_none() {
                self.responded_at = Some(now);
            }
        }
        self.updated_at = now;
    }

    /// Operator alert plus an acknowledgement to the sender.
    pub fn notifications(&self) -> Vec<NotificationIntent> {
        vec![self.intent(Audience::Operator), self.intent(Audience::Client)]
    }

    pub fn intent(&self, audience: Audience) -> NotificationIntent {
        let payload = NotificationPayload {
            reference: self.reference.clone(),
            client_name: self.name.clone(),
            subject: self.subject.clone(),
            amount: None,
            currency: None,
            transaction_id: None,
            status: None,
            payment_status: None,
        };
        NotificationIntent::new(
            NotificationEvent::ContactReceived,
            audience,
            self.email.clone(),
            payload,
        )
    }
}
