mod common;

use anyhow::Result;
use common::{add_saving, test_service};
use family_money::application::AppError;
use family_money::storage::RecordOrder;
use uuid::Uuid;

#[tokio::test]
async fn test_savings_total() -> Result<()> {
    let (service, _temp) = test_service().await?;

    assert_eq!(service.savings_total().await?, 0);

    add_saving(&service, 10000, "2024-01-01").await?;
    add_saving(&service, 2550, "2024-02-01").await?;

    assert_eq!(service.savings_total().await?, 12550);
    assert_eq!(service.list_savings(RecordOrder::Newest, None).await?.len(), 2);

    Ok(())
}

#[tokio::test]
async fn test_get_saving() -> Result<()> {
    let (service, _temp) = test_service().await?;

    let saving = add_saving(&service, 5000, "2024-01-01").await?;
    let stored = service.get_saving(saving.id).await?;
    assert_eq!(stored.source, "Salary");
    assert_eq!(stored.amount_cents, 5000);

    assert!(matches!(
        service.get_saving(Uuid::new_v4()).await,
        Err(AppError::SavingNotFound(_))
    ));

    Ok(())
}
