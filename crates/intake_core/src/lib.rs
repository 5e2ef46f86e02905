pub mod form;
pub mod pipeline;

pub use form::FormController;
pub use pipeline::{FormSession, SessionClosed, SessionEvent, SubmitError, SUCCESS_DISPLAY_DELAY};
