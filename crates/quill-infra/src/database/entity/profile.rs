//! Profile entity for SeaORM.

use sea_orm::Set;
use sea_orm::entity::prelude::*;

use quill_core::domain::{NewProfile, ProfileUpdate};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "profiles")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub bio: String,
    #[sea_orm(unique)]
    pub user_id: i32,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::user::Entity",
        from = "Column::UserId",
        to = "super::user::Column::Id",
        on_update = "Cascade",
        on_delete = "Restrict"
    )]
    User,
}

impl Related<super::user::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::User.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl From<Model> for quill_core::domain::Profile {
    fn from(model: Model) -> Self {
        Self {
            id: model.id,
            bio: model.bio,
            user_id: model.user_id,
        }
    }
}

impl From<&NewProfile> for ActiveModel {
    fn from(profile: &NewProfile) -> Self {
        Self {
            bio: Set(profile.bio.clone()),
            user_id: Set(profile.user_id),
            ..Default::default()
        }
    }
}

impl From<&ProfileUpdate> for ActiveModel {
    fn from(update: &ProfileUpdate) -> Self {
        let mut model = <Self as Default>::default();
        if let Some(bio) = &update.bio {
            model.bio = Set(bio.clone());
        }
        model
    }
}
