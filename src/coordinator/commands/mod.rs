pub mod select_option;
pub mod set_mode;
pub mod set_point;
