pub mod attach;
pub mod down;
pub mod rm;
pub mod up;
