pub mod prelude;

pub mod accounts;
pub mod branches;
pub mod companies;
pub mod industries;
pub mod member_skills;
pub mod members;
pub mod security_events;
pub mod skills;
