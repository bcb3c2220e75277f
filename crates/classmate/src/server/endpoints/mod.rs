pub mod canvas;
pub mod classmates;
pub mod courses;
pub mod secrets;
pub mod status;
