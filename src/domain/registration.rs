use crate::domain::notification::{
    Audience, NotificationEvent, NotificationIntent, NotificationPayload,
};
use crate::domain::reference::ReferenceCode;
use crate::domain::validation;
use crate::error::Result;
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Default, Serialize, Deserialize, PartialEq, Eq, Clone, Copy)]
#[serde(rename_all = "kebab-case")]
pub enum ParticipantRole {
    #[default]
    Student,
    Researcher,
    Professional,
    Faculty,
    Other,
}

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq, Clone, Copy)]
#[serde(rename_all = "kebab-case")]
pub enum ProgramType {
    Workshop,
    ShortCourse,
    Bootcamp,
    Certification,
}

#[derive(Debug, Default, Serialize, Deserialize, PartialEq, Eq, Clone, Copy)]
#[serde(rename_all = "kebab-case")]
pub enum ExperienceLevel {
    #[default]
    Beginner,
    Intermediate,
    Advanced,
}

/// A program on the public training calendar.
#[derive(Debug, Serialize, PartialEq, Eq, Clone, Copy)]
pub struct TrainingProgram {
    pub id: &'static str,
    pub name: &'static str,
    pub program_type: ProgramType,
    pub duration: &'static str,
    pub level: ExperienceLevel,
    pub description: &'static str,
}

pub const TRAINING_PROGRAMS: [TrainingProgram; 6] = [
    TrainingProgram {
        id: "intro-bioinformatics",
        name: "Introduction to Bioinformatics",
        program_type: ProgramType::Workshop,
        duration: "3 days",
        level: ExperienceLevel::Beginner,
        description: "Learn the fundamentals of bioinformatics, including sequence analysis \
                      and database usage.",
    },
    TrainingProgram {
        id: "data-analysis-r",
        name: "Data Analysis with R",
        program_type: ProgramType::ShortCourse,
        duration: "2 weeks",
        level: ExperienceLevel::Intermediate,
        description: "Master statistical analysis and visualization using R programming \
                      language.",
    },
    TrainingProgram {
        id: "genomics-bootcamp",
        name: "Genomics Analysis Bootcamp",
        program_type: ProgramType::Bootcamp,
        duration: "4 weeks",
        level: ExperienceLevel::Intermediate,
        description: "Intensive training in genomic data analysis, from raw sequencing data \
                      to biological insights.",
    },
    TrainingProgram {
        id: "ml-biology",
        name: "Machine Learning in Biology",
        program_type: ProgramType::ShortCourse,
        duration: "3 weeks",
        level: ExperienceLevel::Advanced,
        description: "Apply machine learning algorithms to biological and biomedical problems.",
    },
    TrainingProgram {
        id: "python-biologists",
        name: "Python for Biologists",
        program_type: ProgramType::Workshop,
        duration: "5 days",
        level: ExperienceLevel::Beginner,
        description: "Learn Python programming for biological data analysis and automation.",
    },
    TrainingProgram {
        id: "statistical-methods",
        name: "Statistical Methods for Research",
        program_type: ProgramType::ShortCourse,
        duration: "2 weeks",
        level: ExperienceLevel::Intermediate,
        description: "Comprehensive training in statistical methods commonly used in \
                      biological research.",
    },
];

#[derive(Debug, Default, Serialize, Deserialize, PartialEq, Eq, Clone, Copy)]
#[serde(rename_all = "kebab-case")]
pub enum RegistrationStatus {
    #[default]
    Pending,
    Confirmed,
    Waitlisted,
    Cancelled,
}

impl RegistrationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Confirmed => "confirmed",
            Self::Waitlisted => "waitlisted",
            Self::Cancelled => "cancelled",
        }
    }
}

#[derive(Debug, Serialize, Deserialize, PartialEq, Clone)]
pub struct NewRegistration {
    pub full_name: String,
    pub email: String,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub institution: Option<String>,
    #[serde(default)]
    pub role: Option<ParticipantRole>,
    pub program_type: ProgramType,
    pub program_name: String,
    #[serde(default)]
    pub program_date: Option<NaiveDate>,
    #[serde(default)]
    pub experience_level: Option<ExperienceLevel>,
    #[serde(default)]
    pub motivation: Option<String>,
    #[serde(default)]
    pub special_requirements: Option<String>,
}

/// Sign-up for a training program. Status is set freely by operators.
#[derive(Debug, Serialize, Deserialize, PartialEq, Clone)]
pub struct TrainingRegistration {
    pub id: Uuid,
    pub reference: ReferenceCode,
    pub full_name: String,
    pub email: String,
    pub phone: Option<String>,
    pub institution: Option<String>,
    pub role: ParticipantRole,
    pub program_type: ProgramType,
    pub program_name: String,
    pub program_date: Option<NaiveDate>,
    pub experience_level: ExperienceLevel,
    pub motivation: Option<String>,
    pub special_requirements: Option<String>,
    pub status: RegistrationStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TrainingRegistration {
    /// Validates `input` and builds a pending registration.
    pub fn create(
        input: NewRegistration,
        reference: ReferenceCode,
        now: DateTime<Utc>,
    ) -> Result<Self> {
        let phone = match validation::optional(input.phone) {
            Some(phone) => Some(validation::mobile_number("phone", &phone)?),
            None => None,
        };
        Ok(Self {
            id: Uuid::new_v4(),
            reference,
            full_name: validation::non_empty("full_name", &input.full_name)?,
            email: validation::email("email", &input.email)?,
            phone,
            institution: validation::optional(input.institution),
            role: input.role.unwrap_or_default(),
            program_type: input.program_type,
            program_name: validation::non_empty("program_name", &input.program_name)?,
            program_date: input.program_date,
            experience_level: input.experience_level.unwrap_or_default(),
            motivation: validation::optional(input.motivation),
            special_requirements: validation::optional(input.special_requirements),
            status: RegistrationStatus::Pending,
            created_at: now,
            updated_at: now,
        })
    }

    /// Confirmation to the participant and a heads-up to the operator.
    pub fn notifications(&self) -> Vec<NotificationIntent> {
        let payload = NotificationPayload {
            reference: self.reference.clone(),
            client_name: self.full_name.clone(),
            subject: self.program_name.clone(),
            amount: None,
            currency: None,
            transaction_id: None,
            status: Some(self.status.as_str().to_string()),
            payment_status: None,
        };
        [Audience::Client, Audience::Operator]
            .into_iter()
            .map(|audience| {
                NotificationIntent::new(
                    NotificationEvent::RegistrationReceived,
                    audience,
                    self.email.clone(),
                    payload.clone(),
                )
            })
            .collect()
    }
}
