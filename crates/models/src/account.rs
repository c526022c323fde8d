use sea_orm::{entity::prelude::*, ConnectionTrait, Set};
use uuid::Uuid;
use serde::{Deserialize, Serialize};

use crate::errors::ModelError;
use crate::{password_reset_token, verification_token};

pub const EMAIL_INDEX: &str = "uniq_account_email";
pub const USERNAME_INDEX: &str = "uniq_account_username";

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "account")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub email: String,
    pub username: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub email_verified: bool,
    pub created_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter)]
pub enum Relation {
    VerificationToken,
    PasswordResetToken,
}

impl RelationTrait for Relation {
    fn def(&self) -> RelationDef {
        match self {
            Relation::VerificationToken => Entity::has_many(verification_token::Entity).into(),
            Relation::PasswordResetToken => Entity::has_many(password_reset_token::Entity).into(),
        }
    }
}

impl Related<verification_token::Entity> for Entity {
    fn to() -> RelationDef { Relation::VerificationToken.def() }
}

impl Related<password_reset_token::Entity> for Entity {
    fn to() -> RelationDef { Relation::PasswordResetToken.def() }
}

impl ActiveModelBehavior for ActiveModel {}

pub async fn find_by_id<C: ConnectionTrait>(db: &C, id: Uuid) -> Result<Option<Model>, ModelError> {
    Ok(Entity::find_by_id(id).one(db).await?)
}

pub async fn find_by_email<C: ConnectionTrait>(db: &C, email: &str) -> Result<Option<Model>, ModelError> {
    Ok(Entity::find().filter(Column::Email.eq(email)).one(db).await?)
}

pub async fn find_by_username<C: ConnectionTrait>(db: &C, username: &str) -> Result<Option<Model>, ModelError> {
    Ok(Entity::find().filter(Column::Username.eq(username)).one(db).await?)
}

/// Insert a new account row. A duplicate email or username surfaces as
/// `ModelError::Conflict` naming the violated index.
pub async fn insert<C: ConnectionTrait>(db: &C, model: Model) -> Result<Model, ModelError> {
    if !model.email.contains('@') { return Err(ModelError::Validation("invalid email".into())); }
    if model.username.trim().is_empty() { return Err(ModelError::Validation("username required".into())); }
    if model.password_hash.trim().is_empty() { return Err(ModelError::Validation("password hash required".into())); }
    let am = ActiveModel {
        id: Set(model.id),
        email: Set(model.email),
        username: Set(model.username),
        password_hash: Set(model.password_hash),
        email_verified: Set(model.email_verified),
        created_at: Set(model.created_at),
    };
    Ok(am.insert(db).await?)
}

/// Overwrite the mutable columns of an existing account. `created_at` is never touched.
pub async fn update<C: ConnectionTrait>(db: &C, model: Model) -> Result<Model, ModelError> {
    let mut am: ActiveModel = Entity::find_by_id(model.id)
        .one(db)
        .await?
        .ok_or_else(|| ModelError::Validation("account not found".into()))?
        .into();
    am.email = Set(model.email);
    am.username = Set(model.username);
    am.password_hash = Set(model.password_hash);
    am.email_verified = Set(model.email_verified);
    Ok(am.update(db).await?)
}

pub async fn hard_delete<C: ConnectionTrait>(db: &C, id: Uuid) -> Result<(), ModelError> {
    Entity::delete_by_id(id).exec(db).await?;
    Ok(())
}
