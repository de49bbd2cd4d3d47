//! Domain models: the contact form and greeting events
//!
//! Nothing in here touches the terminal or the network.

pub mod form;
pub mod greeting;

pub use form::{Field, FormState, Submission};
pub use greeting::{Greeting, GreetingFilter};
