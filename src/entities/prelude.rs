pub use super::accounts::Entity as Accounts;
pub use super::branches::Entity as Branches;
pub use super::companies::Entity as Companies;
pub use super::industries::Entity as Industries;
pub use super::member_skills::Entity as MemberSkills;
pub use super::members::Entity as Members;
pub use super::security_events::Entity as SecurityEvents;
pub use super::skills::Entity as Skills;
