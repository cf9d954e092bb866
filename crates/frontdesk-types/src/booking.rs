//! Booking state of the scripted receptionist.
//!
//! `ConversationState` is the position of the slot-filling script and
//! `AppointmentSlots` holds what the visitor has answered so far.

use serde::{Deserialize, Serialize};
use std::fmt;

/// States of the scripted appointment-booking dialogue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConversationState {
    /// Idle; the next input is classified by intent.
    #[default]
    Greeting,
    AskingName,
    AskingPhone,
    AskingEmail,
    AskingDoctor,
    AskingDate,
    AskingTime,
    /// The appointment is booked; waiting for closure or another request.
    Completed,
}

impl ConversationState {
    /// Returns the string label for this state.
    pub fn label(self) -> &'static str {
        match self {
            Self::Greeting => "greeting",
            Self::AskingName => "asking_name",
            Self::AskingPhone => "asking_phone",
            Self::AskingEmail => "asking_email",
            Self::AskingDoctor => "asking_doctor",
            Self::AskingDate => "asking_date",
            Self::AskingTime => "asking_time",
            Self::Completed => "completed",
        }
    }
}

impl fmt::Display for ConversationState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Appointment details collected by the booking script.
///
/// Each field is written once, in declaration order, and the whole record is
/// cleared when the script returns to [`ConversationState::Greeting`].
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct AppointmentSlots {
    pub name: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub doctor: Option<String>,
    pub date: Option<String>,
    pub time: Option<String>,
}

impl AppointmentSlots {
    /// True when no field has been collected.
    pub fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.phone.is_none()
            && self.email.is_none()
            && self.doctor.is_none()
            && self.date.is_none()
            && self.time.is_none()
    }
}
