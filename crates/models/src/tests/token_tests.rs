use crate::{account, password_reset_token, verification_token};
use anyhow::Result;
use chrono::{Duration, Utc};
use sea_orm::{EntityTrait, ModelTrait};
use uuid::Uuid;

use super::{sample_account, setup_test_db};

fn verification(account_id: Uuid) -> verification_token::Model {
    verification_token::Model {
        id: Uuid::new_v4(),
        token: format!("vt-{}", Uuid::new_v4().simple()),
        account_id,
        expires_at: (Utc::now() + Duration::hours(2)).into(),
        used: false,
    }
}

#[tokio::test]
async fn test_mark_used_flips_exactly_once() -> Result<()> {
    let Some(db) = setup_test_db().await else { return Ok(()) };
    let acc = account::insert(&db, sample_account("tok")).await?;
    let vt = verification_token::insert(&db, verification(acc.id)).await?;

    assert!(verification_token::mark_used(&db, vt.id).await?);
    assert!(!verification_token::mark_used(&db, vt.id).await?);
    let found = verification_token::find_by_token(&db, &vt.token).await?.expect("token");
    assert!(found.used);

    account::hard_delete(&db, acc.id).await?;
    Ok(())
}

#[tokio::test]
async fn test_delete_all_for_account_only_touches_owner() -> Result<()> {
    let Some(db) = setup_test_db().await else { return Ok(()) };
    let a = account::insert(&db, sample_account("own")).await?;
    let b = account::insert(&db, sample_account("own")).await?;
    verification_token::insert(&db, verification(a.id)).await?;
    verification_token::insert(&db, verification(a.id)).await?;
    let keep = verification_token::insert(&db, verification(b.id)).await?;

    assert_eq!(verification_token::delete_all_for_account(&db, a.id).await?, 2);
    assert!(verification_token::find_by_token(&db, &keep.token).await?.is_some());

    account::hard_delete(&db, a.id).await?;
    account::hard_delete(&db, b.id).await?;
    Ok(())
}

#[tokio::test]
async fn test_tokens_cascade_with_account() -> Result<()> {
    let Some(db) = setup_test_db().await else { return Ok(()) };
    let acc = account::insert(&db, sample_account("cascade")).await?;
    let vt = verification_token::insert(&db, verification(acc.id)).await?;
    let pr = password_reset_token::insert(&db, password_reset_token::Model {
        id: Uuid::new_v4(),
        token: format!("pr-{}", Uuid::new_v4().simple()),
        account_id: acc.id,
        expires_at: (Utc::now() + Duration::hours(2)).into(),
        used: false,
    }).await?;

    let related = acc.find_related(verification_token::Entity).all(&db).await?;
    assert_eq!(related.len(), 1);

    account::Entity::delete_by_id(acc.id).exec(&db).await?;
    assert!(verification_token::find_by_token(&db, &vt.token).await?.is_none());
    assert!(password_reset_token::find_by_token(&db, &pr.token).await?.is_none());
    Ok(())
}
