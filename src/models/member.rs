use serde::{Deserialize, Serialize};

/// Input for creating or importing a member profile. Lookup values
/// (branch/industry/company/skills) are carried by name and resolved with
/// get-or-create semantics at write time.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MemberInput {
    pub full_name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub batch_year: Option<i32>,
    pub membership_no: Option<String>,
    pub membership_type: Option<String>,
    pub branch: Option<String>,
    pub industry: Option<String>,
    pub company: Option<String>,
    #[serde(default)]
    pub skills: Vec<String>,
}
