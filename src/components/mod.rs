pub mod palette;
pub mod schemes;
pub mod step_bar;
