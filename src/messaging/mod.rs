// Messaging - Lock-free audio -> control notifications

pub mod channels;
pub mod event;
