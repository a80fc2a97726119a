// Engine orchestration — strategy dispatch, lifecycle, and the control surface.

pub mod control;
pub mod dispatcher;
pub mod fallback;
pub mod lifecycle;
