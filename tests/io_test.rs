mod common;

use anyhow::Result;
use common::{
    add_expense, add_saving, create_plan, insert_unreadable_expense, test_service,
    test_service_with_pool, SampleLedger,
};
use family_money::domain::Priority;
use family_money::io::{Exporter, ImportOptions, Importer};
use family_money::storage::RecordOrder;

#[tokio::test]
async fn test_full_snapshot_round_trip() -> Result<()> {
    let (source, _temp1) = test_service().await?;
    SampleLedger::create(&source).await?;
    add_saving(&source, 7500, "2024-01-31").await?;
    let plan = create_plan(&source, "Washer", 60000, Some(15000), Some(Priority::High)).await?;

    let mut buffer = Vec::new();
    let snapshot = Exporter::new(&source).export_full_json(&mut buffer).await?;
    assert_eq!(snapshot.expenses.len(), 3);
    assert_eq!(snapshot.savings.len(), 1);
    assert_eq!(snapshot.purchase_plans.len(), 1);

    let (target, _temp2) = test_service().await?;
    let result = Importer::new(&target)
        .import_full_json(buffer.as_slice(), ImportOptions::default())
        .await?;
    assert_eq!(result.imported, 5);
    assert!(result.errors.is_empty());

    assert_eq!(target.balance().await?, source.balance().await?);
    let restored = target.get_plan(plan.id).await?;
    assert_eq!(restored.current_saved_cents, 15000);
    assert_eq!(restored.priority, Priority::High);

    Ok(())
}

#[tokio::test]
async fn test_snapshot_import_duplicates() -> Result<()> {
    let (service, _temp) = test_service().await?;
    SampleLedger::create(&service).await?;

    let mut buffer = Vec::new();
    Exporter::new(&service).export_full_json(&mut buffer).await?;

    let importer = Importer::new(&service);

    let result = importer
        .import_full_json(buffer.as_slice(), ImportOptions::default())
        .await?;
    assert_eq!(result.imported, 0);
    assert_eq!(result.errors.len(), 3);

    let result = importer
        .import_full_json(
            buffer.as_slice(),
            ImportOptions {
                dry_run: false,
                skip_duplicates: true,
            },
        )
        .await?;
    assert_eq!(result.skipped, 3);
    assert!(result.errors.is_empty());
    assert_eq!(service.record_counts().await?.expenses, 3);

    Ok(())
}

#[tokio::test]
async fn test_expense_csv_round_trip() -> Result<()> {
    let (source, pool, _temp1) = test_service_with_pool().await?;
    add_expense(&source, 1234, "Books", "2024-05-06").await?;
    add_expense(&source, 99, "Snacks", "2024-05-07").await?;
    insert_unreadable_expense(&pool, 700).await?;

    let mut buffer = Vec::new();
    let count = Exporter::new(&source).export_expenses_csv(&mut buffer).await?;
    assert_eq!(count, 3);

    let (target, _temp2) = test_service().await?;
    let result = Importer::new(&target)
        .import_expenses_csv(buffer.as_slice(), ImportOptions::default())
        .await?;
    assert_eq!(result.imported, 3);
    assert!(result.errors.is_empty());

    let original = source.list_expenses(RecordOrder::Recorded, None).await?;
    let imported = target.list_expenses(RecordOrder::Recorded, None).await?;
    assert_eq!(imported.len(), original.len());
    for (before, after) in original.iter().zip(&imported) {
        assert_eq!(after.id, before.id);
        assert_eq!(after.amount_cents, before.amount_cents);
        assert_eq!(after.category, before.category);
        assert_eq!(after.date, before.date);
        assert_eq!(after.created_at, before.created_at);
    }

    let undated = target.get_expense(original[0].id).await?;
    assert_eq!(undated.amount_cents, 700);
    assert!(undated.date.is_none());

    Ok(())
}

#[tokio::test]
async fn test_expense_csv_import_reports_bad_rows() -> Result<()> {
    let (service, _temp) = test_service().await?;

    let csv = "id,date,amount_cents,category,description,family_member\n\
               ,2024-01-01,500,Food,Lunch,Ana\n\
               ,2024-01-02,-5,Food,Refund,Ana\n\
               ,not-a-date,700,Food,Dinner,Ana\n";

    let result = Importer::new(&service)
        .import_expenses_csv(csv.as_bytes(), ImportOptions::default())
        .await?;

    assert_eq!(result.imported, 1);
    assert_eq!(result.errors.len(), 2);
    assert_eq!(result.errors[0].line, 3);
    assert_eq!(result.errors[0].field.as_deref(), Some("amount_cents"));
    assert_eq!(result.errors[1].field.as_deref(), Some("date"));

    Ok(())
}

#[tokio::test]
async fn test_dry_run_imports_nothing() -> Result<()> {
    let (service, _temp) = test_service().await?;

    let csv = "id,date,amount_cents,category,description,family_member\n\
               ,2024-01-01,500,Food,Lunch,Ana\n";

    let result = Importer::new(&service)
        .import_expenses_csv(
            csv.as_bytes(),
            ImportOptions {
                dry_run: true,
                skip_duplicates: false,
            },
        )
        .await?;

    assert_eq!(result.imported, 1);
    assert_eq!(service.record_counts().await?.expenses, 0);

    Ok(())
}
