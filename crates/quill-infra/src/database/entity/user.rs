//! User entity for SeaORM.

use sea_orm::Set;
use sea_orm::entity::prelude::*;

use quill_core::domain::{NewUser, UserUpdate};

/// Postgres `role` enum.
#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum)]
#[sea_orm(rs_type = "String", db_type = "Enum", enum_name = "role")]
pub enum Role {
    #[sea_orm(string_value = "USER")]
    User,
    #[sea_orm(string_value = "ADMIN")]
    Admin,
}

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "users")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    #[sea_orm(unique)]
    pub email: String,
    pub name: String,
    pub password_hash: String,
    pub role: Role,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_one = "super::profile::Entity")]
    Profile,
    #[sea_orm(has_many = "super::post::Entity")]
    Posts,
}

impl Related<super::profile::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Profile.def()
    }
}

impl Related<super::post::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Posts.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl From<quill_core::domain::Role> for Role {
    fn from(role: quill_core::domain::Role) -> Self {
        match role {
            quill_core::domain::Role::User => Self::User,
            quill_core::domain::Role::Admin => Self::Admin,
        }
    }
}

impl From<Role> for quill_core::domain::Role {
    fn from(role: Role) -> Self {
        match role {
            Role::User => Self::User,
            Role::Admin => Self::Admin,
        }
    }
}

/// Conversion from SeaORM Model to Domain User.
impl From<Model> for quill_core::domain::User {
    fn from(model: Model) -> Self {
        Self {
            id: model.id,
            email: model.email,
            name: model.name,
            password_hash: model.password_hash,
            role: model.role.into(),
        }
    }
}

/// Insert payload for the user row alone; nested rows are written separately.
impl From<&NewUser> for ActiveModel {
    fn from(user: &NewUser) -> Self {
        Self {
            email: Set(user.email.clone()),
            name: Set(user.name.clone()),
            password_hash: Set(user.password_hash.clone()),
            role: Set(user.role.into()),
            ..Default::default()
        }
    }
}

/// Only the columns present in the update are set.
impl From<&UserUpdate> for ActiveModel {
    fn from(update: &UserUpdate) -> Self {
        let mut model = <Self as Default>::default();
        if let Some(email) = &update.email {
            model.email = Set(email.clone());
        }
        if let Some(name) = &update.name {
            model.name = Set(name.clone());
        }
        if let Some(hash) = &update.password_hash {
            model.password_hash = Set(hash.clone());
        }
        if let Some(role) = update.role {
            model.role = Set(role.into());
        }
        model
    }
}
