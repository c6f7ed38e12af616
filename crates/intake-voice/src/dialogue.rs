//! Dialogue transition table: `(state, record, answer) -> (next state, prompt, effect)`.
//!
//! Every state except `AddressValidation` stores the answer verbatim (surrounding
//! whitespace trimmed) into the field it is waiting for. `AddressValidation` classifies
//! the answer as confirm or deny; anything that is not a confirmation is a denial.

use crate::record::{ConversationState, IntakeRecord};
use tracing::{debug, info};

pub const GREETING_PROMPT: &str = "Hello, this is Emergency Crime Reporting Service. I'm here to help you report a crime incident. May I have your full name please?";
pub const CRIME_TYPE_PROMPT: &str = "Thank you. What type of crime would you like to report?";
pub const AREA_PROMPT: &str = "I understand. Now I need your location details. Which area are you in?";
pub const LANDMARK_PROMPT: &str = "What is the nearest landmark to your location?";
pub const CITY_PROMPT: &str = "Which city are you in?";
pub const DISTRICT_PROMPT: &str = "What is your district?";
pub const ADDRESS_RETRY_PROMPT: &str = "Let me collect your address details again. Which area are you in?";
pub const SUBMISSION_FAILED_PROMPT: &str = "There was an error submitting your report. Please try again.";

const CONFIRMATION_WORDS: [&str; 3] = ["yes", "correct", "right"];

/// Side effect the session must carry out after a transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Effect {
    None,
    /// Compose `full_address` and ask the caller to validate it.
    ConstructAddress,
    /// Hand the finished record to the submission gateway.
    Submit,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transition {
    pub next: ConversationState,
    /// Prompt to speak for the next state, if any.
    pub prompt: Option<String>,
    pub effect: Effect,
}

impl Transition {
    fn prompt(next: ConversationState, prompt: &str) -> Self {
        Self {
            next,
            prompt: Some(prompt.to_string()),
            effect: Effect::None,
        }
    }

    fn effect(next: ConversationState, effect: Effect) -> Self {
        Self {
            next,
            prompt: None,
            effect,
        }
    }
}

/// Advance the conversation with one caller answer.
///
/// Returns `None` when the answer is blank or the state does not take input; in that
/// case neither the state nor the record changes.
pub fn advance(
    state: ConversationState,
    record: &mut IntakeRecord,
    input: &str,
) -> Option<Transition> {
    let answer = input.trim();
    if answer.is_empty() {
        debug!(target: "intake::dialogue", state = %state, "blank answer ignored");
        return None;
    }

    use ConversationState::*;
    let transition = match state {
        Greeting => {
            record.name = answer.to_string();
            Transition::prompt(Name, CRIME_TYPE_PROMPT)
        }
        Name => {
            record.crime_type = answer.to_string();
            Transition::prompt(CrimeType, AREA_PROMPT)
        }
        CrimeType => {
            record.area = answer.to_string();
            Transition::prompt(Area, LANDMARK_PROMPT)
        }
        // Re-entered after a denied address: the area was cleared and is asked again.
        Area if record.area.is_empty() => {
            record.area = answer.to_string();
            Transition::prompt(Area, LANDMARK_PROMPT)
        }
        Area => {
            record.landmark = answer.to_string();
            Transition::prompt(Landmark, CITY_PROMPT)
        }
        Landmark => {
            record.city = answer.to_string();
            Transition::prompt(City, DISTRICT_PROMPT)
        }
        City => {
            record.district = answer.to_string();
            Transition::effect(District, Effect::ConstructAddress)
        }
        AddressValidation if is_confirmation(answer) => Transition::effect(Complete, Effect::Submit),
        AddressValidation => {
            record.clear_address();
            Transition::prompt(Area, ADDRESS_RETRY_PROMPT)
        }
        District | Complete => {
            debug!(target: "intake::dialogue", state = %state, "state takes no input");
            return None;
        }
    };

    info!(
        target: "intake::dialogue",
        from = %state,
        to = %transition.next,
        effect = ?transition.effect,
        "turn advanced"
    );
    Some(transition)
}

/// Carry out [`Effect::ConstructAddress`]: compose the address and ask for validation.
pub fn construct_address(record: &mut IntakeRecord) -> Transition {
    let address = record.construct_address();
    let prompt = format!("Your complete address is: {address}. Is this correct?");
    Transition::prompt(ConversationState::AddressValidation, &prompt)
}

/// Case-insensitive containment match against the confirmation words.
pub fn is_confirmation(answer: &str) -> bool {
    let lowered = answer.to_lowercase();
    CONFIRMATION_WORDS.iter().any(|w| lowered.contains(w))
}

pub fn closing_prompt(ticket_id: &str) -> String {
    format!(
        "Your emergency report has been recorded. Report ID: {ticket_id}. Authorities will contact you soon. Stay safe."
    )
}
