use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "accounts")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,

    #[sea_orm(unique)]
    pub username: String,

    #[sea_orm(unique)]
    pub email: Option<String>,

    /// Argon2id password hash (PHC string)
    pub password_hash: String,

    /// Salt used for the current hash
    pub salt: String,

    /// "admin" or "member"
    pub role: String,

    /// Forces a password change before normal use (set on creation and admin reset).
    pub first_login: bool,

    /// The one-time username change has been consumed.
    pub username_changed: bool,

    /// The stored password was system-generated and may be surfaced once.
    pub password_generated: bool,

    pub failed_attempts: i32,

    /// RFC 3339 instant until which logins are refused; a past value means unlocked.
    pub locked_until: Option<String>,

    pub last_login: Option<String>,

    /// Owned member profile, at most one per account.
    pub member_id: Option<i32>,

    pub settings_json: String,

    pub created_at: String,

    pub updated_at: String,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::members::Entity",
        from = "Column::MemberId",
        to = "super::members::Column::Id"
    )]
    Member,
}

impl Related<super::members::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Member.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
