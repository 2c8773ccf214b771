mod home;

pub use home::home_page;
