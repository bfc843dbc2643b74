//! Reply texts and the quick-reply keyboard layout.
//!
//! Every user-visible string lives here so flows and tests share one source.

use apiary_core::ReplyKeyboard;

pub const BUTTON_REGISTER: &str = "Register";
pub const BUTTON_HELP: &str = "Help";
pub const BUTTON_RESET: &str = "Reset";
pub const BUTTON_ADD_FAMILY: &str = "Add family";
pub const BUTTON_DELETE_FAMILY: &str = "Delete family";

pub const GREETING: &str = "Hello! I'm the apiary assistant. How can I help you?";

pub const HELP: &str = "Here is what I can do:\n\
/start - greet you and show the buttons\n\
/reg - register as a keeper\n\
/add_family - add a bee family\n\
/delete_family - delete a bee family\n\
/help - show this help";

pub const REGISTRATION_PROMPT: &str = "Enter your first name, last name and position:";

pub const REGISTRATION_FORMAT_ERROR: &str =
    "Invalid input. Please enter your first name, last name and position (at least three words).";

pub const PASSWORD_PROMPT: &str = "Now choose a password:";

pub const PASSWORD_EMPTY_ERROR: &str = "The password cannot be empty. Choose a password:";

pub const REGISTRATION_COMPLETE: &str = "Registration complete! Welcome aboard.";

pub const FAMILY_PROMPT: &str = "Enter the family details in this format:\n\
family number, birth year, breed, species\n\
for example:\n\
12345, 2020, Carnica, Apis mellifera";

pub const FAMILY_FORMAT_ERROR: &str =
    "Malformed family details: expected exactly four comma-separated values. \
Send /add_family to try again.";

pub const FAMILY_YEAR_ERROR: &str =
    "The birth year must be a number. Send /add_family to try again.";

pub const DELETE_PROMPT: &str = "Enter the number of the family to delete:";

pub const UNSUPPORTED_CONTENT: &str =
    "I'm just a little bee and cannot handle messages like that.";

pub const STORAGE_FAILURE: &str =
    "Something went wrong while saving your data. Please try again.";

pub const INTERNAL_ERROR: &str =
    "Something went wrong on my side. Please start over with /start.";

pub fn family_added(family_number: &str) -> String {
    format!("Bee family '{family_number}' has been added.")
}

pub fn family_deleted(family_number: &str) -> String {
    format!("Bee family '{family_number}' has been deleted.")
}

pub fn family_not_found(family_number: &str) -> String {
    format!("No bee family with number '{family_number}' was found.")
}

/// The keyboard shown with the greeting: one row for getting started, one
/// row for the family operations.
pub fn main_keyboard() -> ReplyKeyboard {
    ReplyKeyboard::from_rows([
        vec![BUTTON_REGISTER, BUTTON_HELP],
        vec![BUTTON_RESET, BUTTON_ADD_FAMILY, BUTTON_DELETE_FAMILY],
    ])
}
