pub mod coords;
pub mod error;
pub mod screen_capture;
pub mod window;
pub mod worker;
