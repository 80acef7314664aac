mod common;

use std::sync::Arc;

use anyhow::Result;
use common::{Staff, parse_date, test_service};
use leavebook::application::AppError;
use leavebook::domain::{Bucket, Days, Decision, LeaveStatus, LeaveType};

#[tokio::test]
async fn test_submit_and_approve_deducts_balance() -> Result<()> {
    let (service, _temp) = test_service().await?;
    let staff = Staff::create(&service).await?;

    let before = service.get_my_balance(&staff.employee, 2025).await?;
    assert_eq!(before.annual_leave, Days::whole(10));

    let request = service
        .submit_request(
            &staff.employee,
            LeaveType::Annual,
            parse_date("2025-03-10"),
            parse_date("2025-03-12"),
            "Family trip".into(),
        )
        .await?;
    assert_eq!(request.days, Days::whole(3));
    assert_eq!(request.status, LeaveStatus::Pending);

    // Submission alone deducts nothing
    let pending = service.get_my_balance(&staff.employee, 2025).await?;
    assert_eq!(pending.annual_leave, Days::whole(10));

    let approved = service
        .decide(
            &staff.manager,
            request.id,
            Decision::Approved,
            Some("Enjoy".into()),
        )
        .await?;
    assert_eq!(approved.status, LeaveStatus::Approved);
    assert_eq!(approved.approver_id, Some(staff.manager.user_id));
    assert_eq!(approved.remark.as_deref(), Some("Enjoy"));
    assert!(approved.decided_at.is_some());

    let after = service.get_my_balance(&staff.employee, 2025).await?;
    assert_eq!(after.annual_leave, Days::whole(7));
    assert_eq!(after.sick_leave, Days::whole(10));
    assert_eq!(after.personal_leave, Days::whole(5));

    // A second decision is refused and changes nothing
    let again = service
        .decide(&staff.manager, request.id, Decision::Approved, None)
        .await;
    assert!(matches!(
        again,
        Err(AppError::NotPending {
            status: LeaveStatus::Approved,
            ..
        })
    ));
    let unchanged = service.get_my_balance(&staff.employee, 2025).await?;
    assert_eq!(unchanged.annual_leave, Days::whole(7));

    let stored = service.get_request(&staff.employee, request.id).await?;
    assert_eq!(stored.status, LeaveStatus::Approved);

    Ok(())
}

#[tokio::test]
async fn test_single_day_request_counts_one_day() -> Result<()> {
    let (service, _temp) = test_service().await?;
    let staff = Staff::create(&service).await?;

    let request = service
        .submit_request(
            &staff.employee,
            LeaveType::Sick,
            parse_date("2025-05-02"),
            parse_date("2025-05-02"),
            "Flu".into(),
        )
        .await?;
    assert_eq!(request.days, Days::whole(1));

    Ok(())
}

#[tokio::test]
async fn test_submit_rejects_inverted_dates() -> Result<()> {
    let (service, _temp) = test_service().await?;
    let staff = Staff::create(&service).await?;

    let result = service
        .submit_request(
            &staff.employee,
            LeaveType::Annual,
            parse_date("2025-03-12"),
            parse_date("2025-03-10"),
            "Backwards".into(),
        )
        .await;
    assert!(matches!(result, Err(AppError::InvalidDateRange { .. })));

    let mine = service.list_my_requests(&staff.employee, None).await?;
    assert!(mine.is_empty());

    Ok(())
}

#[tokio::test]
async fn test_submit_requires_reason() -> Result<()> {
    let (service, _temp) = test_service().await?;
    let staff = Staff::create(&service).await?;

    let result = service
        .submit_request(
            &staff.employee,
            LeaveType::Personal,
            parse_date("2025-03-10"),
            parse_date("2025-03-10"),
            "   ".into(),
        )
        .await;
    assert!(matches!(result, Err(AppError::InvalidValue(_))));

    Ok(())
}

#[tokio::test]
async fn test_submit_refused_when_bucket_too_small() -> Result<()> {
    let (service, _temp) = test_service().await?;
    let staff = Staff::create(&service).await?;

    // Six personal days against an allotment of five
    let result = service
        .submit_request(
            &staff.employee,
            LeaveType::Personal,
            parse_date("2025-06-02"),
            parse_date("2025-06-07"),
            "Moving house".into(),
        )
        .await;

    match result {
        Err(AppError::InsufficientBalance {
            bucket,
            available,
            requested,
        }) => {
            assert_eq!(bucket, Bucket::Personal);
            assert_eq!(available, Days::whole(5));
            assert_eq!(requested, Days::whole(6));
        }
        other => panic!("expected InsufficientBalance, got {:?}", other),
    }

    let balance = service.get_my_balance(&staff.employee, 2025).await?;
    assert_eq!(balance.personal_leave, Days::whole(5));
    assert!(service.list_my_requests(&staff.employee, None).await?.is_empty());

    Ok(())
}

#[tokio::test]
async fn test_reject_leaves_balance_untouched() -> Result<()> {
    let (service, _temp) = test_service().await?;
    let staff = Staff::create(&service).await?;

    let request = service
        .submit_request(
            &staff.employee,
            LeaveType::Sick,
            parse_date("2025-02-03"),
            parse_date("2025-02-04"),
            "Dentist".into(),
        )
        .await?;

    let rejected = service
        .decide(
            &staff.admin,
            request.id,
            Decision::Rejected,
            Some("Busy week".into()),
        )
        .await?;
    assert_eq!(rejected.status, LeaveStatus::Rejected);

    let balance = service.get_my_balance(&staff.employee, 2025).await?;
    assert_eq!(balance.sick_leave, Days::whole(10));

    // Rejected is terminal too
    let result = service
        .decide(&staff.admin, request.id, Decision::Approved, None)
        .await;
    assert!(matches!(
        result,
        Err(AppError::NotPending {
            status: LeaveStatus::Rejected,
            ..
        })
    ));

    Ok(())
}

#[tokio::test]
async fn test_approval_rechecks_balance() -> Result<()> {
    let (service, _temp) = test_service().await?;
    let staff = Staff::create(&service).await?;

    let first = service
        .submit_request(
            &staff.employee,
            LeaveType::Annual,
            parse_date("2025-07-07"),
            parse_date("2025-07-12"),
            "Summer".into(),
        )
        .await?;
    let second = service
        .submit_request(
            &staff.employee,
            LeaveType::Annual,
            parse_date("2025-08-04"),
            parse_date("2025-08-09"),
            "More summer".into(),
        )
        .await?;

    service
        .decide(&staff.manager, first.id, Decision::Approved, None)
        .await?;

    let result = service
        .decide(&staff.manager, second.id, Decision::Approved, None)
        .await;
    match result {
        Err(AppError::InsufficientBalance {
            available,
            requested,
            ..
        }) => {
            assert_eq!(available, Days::whole(4));
            assert_eq!(requested, Days::whole(6));
        }
        other => panic!("expected InsufficientBalance, got {:?}", other),
    }

    // The refused request stays pending and can still be rejected
    let stored = service.get_request(&staff.manager, second.id).await?;
    assert_eq!(stored.status, LeaveStatus::Pending);
    service
        .decide(&staff.manager, second.id, Decision::Rejected, None)
        .await?;

    let balance = service.get_my_balance(&staff.employee, 2025).await?;
    assert_eq!(balance.annual_leave, Days::whole(4));

    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_approvals_never_overdraw() -> Result<()> {
    let (service, _temp) = test_service().await?;
    let staff = Staff::create(&service).await?;

    // Each fits on its own, together they need 12 of 10 days
    let first = service
        .submit_request(
            &staff.employee,
            LeaveType::Annual,
            parse_date("2025-09-01"),
            parse_date("2025-09-06"),
            "Trip A".into(),
        )
        .await?;
    let second = service
        .submit_request(
            &staff.employee,
            LeaveType::Annual,
            parse_date("2025-10-06"),
            parse_date("2025-10-11"),
            "Trip B".into(),
        )
        .await?;

    let service = Arc::new(service);
    let handles: Vec<_> = [(first.id, staff.manager), (second.id, staff.admin)]
        .into_iter()
        .map(|(id, approver)| {
            let service = Arc::clone(&service);
            tokio::spawn(async move {
                service
                    .decide(&approver, id, Decision::Approved, None)
                    .await
            })
        })
        .collect();

    let mut approved = 0;
    let mut refused = 0;
    for handle in handles {
        match handle.await? {
            Ok(request) => {
                assert_eq!(request.status, LeaveStatus::Approved);
                approved += 1;
            }
            Err(AppError::InsufficientBalance { .. }) => refused += 1,
            Err(e) => panic!("unexpected error: {}", e),
        }
    }
    assert_eq!(approved, 1);
    assert_eq!(refused, 1);

    let balance = service.get_my_balance(&staff.employee, 2025).await?;
    assert_eq!(balance.annual_leave, Days::whole(4));

    let statuses: Vec<LeaveStatus> = service
        .list_my_requests(&staff.employee, None)
        .await?
        .into_iter()
        .map(|r| r.status)
        .collect();
    assert_eq!(
        statuses
            .iter()
            .filter(|s| **s == LeaveStatus::Approved)
            .count(),
        1
    );
    assert_eq!(
        statuses
            .iter()
            .filter(|s| **s == LeaveStatus::Pending)
            .count(),
        1
    );

    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_decisions_on_same_request() -> Result<()> {
    let (service, _temp) = test_service().await?;
    let staff = Staff::create(&service).await?;

    let request = service
        .submit_request(
            &staff.employee,
            LeaveType::Annual,
            parse_date("2025-04-14"),
            parse_date("2025-04-15"),
            "Long weekend".into(),
        )
        .await?;

    let service = Arc::new(service);
    let handles: Vec<_> = [staff.manager, staff.admin]
        .into_iter()
        .map(|approver| {
            let service = Arc::clone(&service);
            let id = request.id;
            tokio::spawn(async move {
                service
                    .decide(&approver, id, Decision::Approved, None)
                    .await
            })
        })
        .collect();

    let mut ok = 0;
    let mut not_pending = 0;
    for handle in handles {
        match handle.await? {
            Ok(_) => ok += 1,
            Err(AppError::NotPending { .. }) => not_pending += 1,
            Err(e) => panic!("unexpected error: {}", e),
        }
    }
    assert_eq!(ok, 1);
    assert_eq!(not_pending, 1);

    // Deducted exactly once
    let balance = service.get_my_balance(&staff.employee, 2025).await?;
    assert_eq!(balance.annual_leave, Days::whole(8));

    Ok(())
}

#[tokio::test]
async fn test_other_leave_has_no_bucket() -> Result<()> {
    let (service, _temp) = test_service().await?;
    let staff = Staff::create(&service).await?;

    // Longer than any allotment
    let request = service
        .submit_request(
            &staff.employee,
            LeaveType::Other,
            parse_date("2025-01-06"),
            parse_date("2025-01-20"),
            "Sabbatical".into(),
        )
        .await?;
    assert_eq!(request.days, Days::whole(15));

    service
        .decide(&staff.manager, request.id, Decision::Approved, None)
        .await?;

    let balance = service.get_my_balance(&staff.employee, 2025).await?;
    assert_eq!(balance.annual_leave, Days::whole(10));
    assert_eq!(balance.sick_leave, Days::whole(10));
    assert_eq!(balance.personal_leave, Days::whole(5));

    Ok(())
}

#[tokio::test]
async fn test_request_charged_to_start_year() -> Result<()> {
    let (service, _temp) = test_service().await?;
    let staff = Staff::create(&service).await?;

    let request = service
        .submit_request(
            &staff.employee,
            LeaveType::Annual,
            parse_date("2025-12-30"),
            parse_date("2026-01-02"),
            "New year".into(),
        )
        .await?;
    assert_eq!(request.days, Days::whole(4));

    service
        .decide(&staff.manager, request.id, Decision::Approved, None)
        .await?;

    assert_eq!(
        service.get_my_balance(&staff.employee, 2025).await?.annual_leave,
        Days::whole(6)
    );
    assert_eq!(
        service.get_my_balance(&staff.employee, 2026).await?.annual_leave,
        Days::whole(10)
    );

    Ok(())
}

#[tokio::test]
async fn test_employee_cannot_decide() -> Result<()> {
    let (service, _temp) = test_service().await?;
    let staff = Staff::create(&service).await?;

    let request = service
        .submit_request(
            &staff.employee,
            LeaveType::Annual,
            parse_date("2025-03-10"),
            parse_date("2025-03-10"),
            "Errand".into(),
        )
        .await?;

    let result = service
        .decide(&staff.employee, request.id, Decision::Approved, None)
        .await;
    assert!(matches!(result, Err(AppError::Unauthorized(_))));

    let result = service.list_all_requests(&staff.other_employee, None).await;
    assert!(matches!(result, Err(AppError::Unauthorized(_))));

    let result = service.get_request(&staff.other_employee, request.id).await;
    assert!(matches!(result, Err(AppError::Unauthorized(_))));

    let stored = service.get_request(&staff.employee, request.id).await?;
    assert_eq!(stored.status, LeaveStatus::Pending);

    Ok(())
}

#[tokio::test]
async fn test_decide_unknown_request() -> Result<()> {
    let (service, _temp) = test_service().await?;
    let staff = Staff::create(&service).await?;

    let result = service
        .decide(
            &staff.manager,
            uuid::Uuid::new_v4(),
            Decision::Approved,
            None,
        )
        .await;
    assert!(matches!(result, Err(AppError::LeaveRequestNotFound(_))));
    assert!(result.unwrap_err().is_not_found());

    Ok(())
}

#[tokio::test]
async fn test_listing_and_status_filter() -> Result<()> {
    let (service, _temp) = test_service().await?;
    let staff = Staff::create(&service).await?;

    let first = service
        .submit_request(
            &staff.employee,
            LeaveType::Annual,
            parse_date("2025-03-03"),
            parse_date("2025-03-03"),
            "One".into(),
        )
        .await?;
    let second = service
        .submit_request(
            &staff.other_employee,
            LeaveType::Sick,
            parse_date("2025-03-04"),
            parse_date("2025-03-05"),
            "Two".into(),
        )
        .await?;
    let third = service
        .submit_request(
            &staff.employee,
            LeaveType::Personal,
            parse_date("2025-03-06"),
            parse_date("2025-03-06"),
            "Three".into(),
        )
        .await?;

    service
        .decide(&staff.manager, first.id, Decision::Approved, None)
        .await?;

    // Newest first
    let all = service.list_all_requests(&staff.manager, None).await?;
    let ids: Vec<_> = all.iter().map(|e| e.request.id).collect();
    assert_eq!(ids, vec![third.id, second.id, first.id]);
    assert_eq!(all[1].user_name, "Oscar Verdi");
    assert_eq!(all[1].user_department.as_deref(), Some("Sales"));

    let pending = service
        .list_all_requests(&staff.admin, Some(LeaveStatus::Pending))
        .await?;
    assert_eq!(pending.len(), 2);

    let mine = service.list_my_requests(&staff.employee, None).await?;
    assert_eq!(mine.len(), 2);
    assert_eq!(mine[0].id, third.id);

    let mine_approved = service
        .list_my_requests(&staff.employee, Some(LeaveStatus::Approved))
        .await?;
    assert_eq!(mine_approved.len(), 1);
    assert_eq!(mine_approved[0].id, first.id);

    Ok(())
}
