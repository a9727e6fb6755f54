pub mod account;
pub mod member;
pub mod settings;

pub use account::{AccountProfile, CreatedAccount, NewAccount, Role};
pub use member::MemberInput;
pub use settings::AccountSettings;
