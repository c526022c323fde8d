use sea_orm::{entity::prelude::*, sea_query::Expr, ConnectionTrait, Set};
use uuid::Uuid;
use serde::{Deserialize, Serialize};

use crate::account;
use crate::errors::ModelError;

/// Single-use email verification token bound to one account.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "verification_token")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    #[sea_orm(unique)]
    pub token: String,
    pub account_id: Uuid,
    pub expires_at: DateTimeWithTimeZone,
    pub used: bool,
}

#[derive(Copy, Clone, Debug, EnumIter)]
pub enum Relation { Account }

impl RelationTrait for Relation {
    fn def(&self) -> RelationDef {
        match self {
            Relation::Account => Entity::belongs_to(account::Entity)
                .from(Column::AccountId)
                .to(account::Column::Id)
                .into(),
        }
    }
}

impl Related<account::Entity> for Entity {
    fn to() -> RelationDef { Relation::Account.def() }
}

impl ActiveModelBehavior for ActiveModel {}

pub async fn find_by_token<C: ConnectionTrait>(db: &C, token: &str) -> Result<Option<Model>, ModelError> {
    Ok(Entity::find().filter(Column::Token.eq(token)).one(db).await?)
}

pub async fn insert<C: ConnectionTrait>(db: &C, model: Model) -> Result<Model, ModelError> {
    if model.token.len() < 16 { return Err(ModelError::Validation("token too short".into())); }
    let am = ActiveModel {
        id: Set(model.id),
        token: Set(model.token),
        account_id: Set(model.account_id),
        expires_at: Set(model.expires_at),
        used: Set(model.used),
    };
    Ok(am.insert(db).await?)
}

/// Flip `used` to true only if it is still false. Returns whether this call did the flip.
pub async fn mark_used<C: ConnectionTrait>(db: &C, id: Uuid) -> Result<bool, ModelError> {
    let res = Entity::update_many()
        .col_expr(Column::Used, Expr::value(true))
        .filter(Column::Id.eq(id))
        .filter(Column::Used.eq(false))
        .exec(db)
        .await?;
    Ok(res.rows_affected == 1)
}

pub async fn delete_all_for_account<C: ConnectionTrait>(db: &C, account_id: Uuid) -> Result<u64, ModelError> {
    let res = Entity::delete_many()
        .filter(Column::AccountId.eq(account_id))
        .exec(db)
        .await?;
    Ok(res.rows_affected)
}
