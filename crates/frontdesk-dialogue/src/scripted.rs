//! Scripted appointment-booking receptionist.
//!
//! From [`ConversationState::Greeting`] the visitor's input is classified by
//! keyword. Booking walks a fixed chain of questions, storing each answer
//! verbatim in [`AppointmentSlots`]. Classification is plain substring
//! matching on the lower-cased input; the first matching rule wins.

use crate::strategy::{AssistantReply, IdleReturn};
use frontdesk_types::{AppointmentSlots, ConversationState};
use std::time::Duration;
use tracing::debug;

/// Greeting spoken when the conversation opens.
pub const DEFAULT_GREETING: &str = "Hello! Welcome to HealthCare Clinic. I'm Sarah, your virtual receptionist. How may I help you today?";

/// Delay between the closing reply and the return to `Greeting`.
pub const IDLE_RETURN_DELAY: Duration = Duration::from_secs(3);

/// What the visitor asked for while in `Greeting`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Intent {
    Book,
    Hours,
    Location,
    Doctors,
    Help,
}

/// Keyword rules in priority order.
const INTENT_RULES: &[(Intent, &[&str])] = &[
    (Intent::Book, &["appointment", "book", "schedule"]),
    (Intent::Hours, &["hours", "time", "open"]),
    (Intent::Location, &["location", "address", "where"]),
    (Intent::Doctors, &["doctor", "physicians"]),
];

const NEGATIVE_CLOSURE: &[&str] = &["no", "that's all", "nothing"];
const AFFIRMATIVE_CONTINUE: &[&str] = &["yes", "another"];

fn contains_any(input: &str, keywords: &[&str]) -> bool {
    keywords.iter().any(|keyword| input.contains(keyword))
}

/// Classifies a greeting-state input. First matching rule wins.
pub fn classify_intent(input: &str) -> Intent {
    let input = input.to_lowercase();
    INTENT_RULES
        .iter()
        .find(|(_, keywords)| contains_any(&input, keywords))
        .map(|(intent, _)| *intent)
        .unwrap_or(Intent::Help)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Closure {
    Negative,
    Continue,
    Other,
}

fn classify_closure(input: &str) -> Closure {
    let input = input.to_lowercase();
    if contains_any(&input, NEGATIVE_CLOSURE) {
        Closure::Negative
    } else if contains_any(&input, AFFIRMATIVE_CONTINUE) {
        Closure::Continue
    } else {
        Closure::Other
    }
}

/// The booking state machine.
#[derive(Debug, Clone, Default)]
pub struct ScriptedReceptionist {
    state: ConversationState,
    slots: AppointmentSlots,
    /// Incremented whenever an idle return is scheduled.
    idle_epoch: u64,
    /// Epoch of the idle return that may still apply, if any.
    pending_idle: Option<u64>,
}

impl ScriptedReceptionist {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> ConversationState {
        self.state
    }

    pub fn slots(&self) -> &AppointmentSlots {
        &self.slots
    }

    /// Advances the script with one visitor input and returns the reply.
    ///
    /// Any input cancels a previously scheduled idle return; a new one is
    /// scheduled only by a negative closure in `Completed`.
    pub fn respond(&mut self, input: &str) -> AssistantReply {
        self.pending_idle = None;
        let from = self.state;

        let reply = match self.state {
            ConversationState::Greeting => self.greet(input),
            ConversationState::AskingName => {
                self.slots.name = Some(input.to_string());
                self.state = ConversationState::AskingPhone;
                AssistantReply::new(format!(
                    "Thank you, {}. What's the best phone number to reach you?",
                    input
                ))
            }
            ConversationState::AskingPhone => {
                self.slots.phone = Some(input.to_string());
                self.state = ConversationState::AskingEmail;
                AssistantReply::new("Perfect! And your email address?")
            }
            ConversationState::AskingEmail => {
                self.slots.email = Some(input.to_string());
                self.state = ConversationState::AskingDoctor;
                AssistantReply::new(
                    "Great! Which doctor would you like to see? We have Dr. Smith, Dr. Johnson, Dr. Williams, or Dr. Brown.",
                )
            }
            ConversationState::AskingDoctor => {
                self.slots.doctor = Some(input.to_string());
                self.state = ConversationState::AskingDate;
                AssistantReply::new(
                    "Excellent choice! What date works best for you? Please say or type the date in format like 'January 15th' or '2026-01-15'.",
                )
            }
            ConversationState::AskingDate => {
                self.slots.date = Some(input.to_string());
                self.state = ConversationState::AskingTime;
                AssistantReply::new(
                    "Perfect! What time would you prefer? Morning, afternoon, or a specific time like 10 AM?",
                )
            }
            ConversationState::AskingTime => {
                self.slots.time = Some(input.to_string());
                self.state = ConversationState::Completed;
                AssistantReply::new(format!(
                    "Wonderful! I've booked your appointment with {} on {} at {}. You'll receive a confirmation email at {}. Is there anything else I can help you with?",
                    self.slots.doctor.as_deref().unwrap_or_default(),
                    self.slots.date.as_deref().unwrap_or_default(),
                    input,
                    self.slots.email.as_deref().unwrap_or_default(),
                ))
            }
            ConversationState::Completed => self.close(input),
        };

        debug!(from = %from, to = %self.state, "scripted transition");
        reply
    }

    fn greet(&mut self, input: &str) -> AssistantReply {
        let text = match classify_intent(input) {
            Intent::Book => {
                self.state = ConversationState::AskingName;
                "Great! I'd be happy to help you book an appointment. May I have your full name, please?"
            }
            Intent::Hours => {
                "We're open Monday to Friday, 9 AM to 5 PM, and Saturday 9 AM to 1 PM. Would you like to book an appointment?"
            }
            Intent::Location => {
                "We're located at 123 Medical Plaza, Downtown. Would you like to book an appointment?"
            }
            Intent::Doctors => {
                "We have Dr. Smith (General Physician), Dr. Johnson (Cardiologist), Dr. Williams (Pediatrician), and Dr. Brown (Dermatologist). Would you like to book an appointment with any of them?"
            }
            Intent::Help => {
                "I can help you book an appointment, provide information about our doctors, office hours, or location. What would you like to know?"
            }
        };
        AssistantReply::new(text)
    }

    fn close(&mut self, input: &str) -> AssistantReply {
        match classify_closure(input) {
            Closure::Negative => {
                self.idle_epoch += 1;
                self.pending_idle = Some(self.idle_epoch);
                AssistantReply {
                    text: "Great! Have a wonderful day and we'll see you at your appointment!"
                        .to_string(),
                    idle_return: Some(IdleReturn {
                        epoch: self.idle_epoch,
                        after: IDLE_RETURN_DELAY,
                    }),
                }
            }
            Closure::Continue => {
                self.reset();
                AssistantReply::new("Of course! What else can I help you with?")
            }
            Closure::Other => {
                self.reset();
                AssistantReply::new("I'm here to help! What do you need?")
            }
        }
    }

    /// Applies a scheduled idle return. Returns `false` when `epoch` was
    /// superseded by later input.
    pub fn return_to_idle(&mut self, epoch: u64) -> bool {
        if self.pending_idle != Some(epoch) {
            debug!(epoch, "ignoring superseded idle return");
            return false;
        }
        self.reset();
        debug!(epoch, "returned to greeting");
        true
    }

    fn reset(&mut self) {
        if !self.slots.is_empty() {
            debug!("clearing appointment details");
        }
        self.state = ConversationState::Greeting;
        self.slots = AppointmentSlots::default();
        self.pending_idle = None;
    }
}
