// HTTP boundary — translates application requests into engine dispatch
// and exposes the control endpoint.

pub mod handler;
