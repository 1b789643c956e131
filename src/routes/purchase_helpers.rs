use diesel::prelude::*;

use crate::error::{AppError, AppResult};
use crate::model::Purchase;
use crate::routes::enrollment_helpers::record_enrollment;
use crate::types::PurchaseStatus;

#[derive(Debug)]
pub enum CompletionOutcome {
    /// This call moved the purchase to `completed` and enrolled the user
    Completed(Purchase),
    /// An earlier delivery already completed it
    AlreadyCompleted(Purchase),
}

impl CompletionOutcome {
    pub fn purchase(&self) -> &Purchase {
        match self {
            CompletionOutcome::Completed(p) | CompletionOutcome::AlreadyCompleted(p) => p,
        }
    }

    pub fn already_processed(&self) -> bool {
        matches!(self, CompletionOutcome::AlreadyCompleted(_))
    }
}

#[derive(Debug)]
pub enum FailureOutcome {
    MarkedFailed(Purchase),
    Unchanged(Purchase),
}

impl FailureOutcome {
    pub fn purchase(&self) -> &Purchase {
        match self {
            FailureOutcome::MarkedFailed(p) | FailureOutcome::Unchanged(p) => p,
        }
    }
}

pub fn find_purchase_by_order(
    conn: &mut SqliteConnection,
    order_id: &str,
) -> AppResult<Option<Purchase>> {
    use crate::schema::purchases::dsl::*;

    let purchase = purchases
        .filter(gateway_order_id.eq(order_id))
        .select(Purchase::as_select())
        .first(conn)
        .optional()?;

    Ok(purchase)
}

pub fn find_completed_purchase(
    conn: &mut SqliteConnection,
    user_id_param: &str,
    course_id_param: &str,
) -> AppResult<Option<Purchase>> {
    use crate::schema::purchases::dsl::*;

    let purchase = purchases
        .filter(user_id.eq(user_id_param))
        .filter(course_id.eq(course_id_param))
        .filter(status.eq(PurchaseStatus::Completed))
        .select(Purchase::as_select())
        .first(conn)
        .optional()?;

    Ok(purchase)
}

/// Mark the purchase for `order_id` completed and enroll the buyer.
///
/// Runs under `BEGIN IMMEDIATE` so a client callback and a webhook for the same order
/// serialize on the write lock; whichever commits second sees `completed` and is a no-op.
pub fn complete_purchase(
    conn: &mut SqliteConnection,
    order_id: &str,
    payment_id: &str,
) -> AppResult<CompletionOutcome> {
    conn.immediate_transaction(|conn| {
        let purchase = find_purchase_by_order(conn, order_id)?
            .ok_or_else(|| AppError::NotFound("Purchase".to_string()))?;

        match purchase.status {
            PurchaseStatus::Completed => {
                if purchase.gateway_payment_id.as_deref() != Some(payment_id) {
                    tracing::warn!(
                        order_id,
                        payment_id,
                        recorded_payment_id = ?purchase.gateway_payment_id,
                        "Order already completed by a different payment"
                    );
                }
                // Heals a relation that lost one side since completion
                record_enrollment(conn, &purchase.user_id, &purchase.course_id)?;
                return Ok(CompletionOutcome::AlreadyCompleted(purchase));
            }
            PurchaseStatus::Refunded => {
                return Err(AppError::Validation(
                    "Purchase has been refunded".to_string(),
                ));
            }
            PurchaseStatus::Created | PurchaseStatus::Failed => {}
        }

        if find_completed_purchase(conn, &purchase.user_id, &purchase.course_id)?.is_some() {
            tracing::warn!(
                order_id,
                payment_id,
                user_id = %purchase.user_id,
                course_id = %purchase.course_id,
                "Second payment for an already purchased course, needs manual refund"
            );
            return Err(AppError::AlreadyEnrolled);
        }

        let now = chrono::Utc::now().naive_utc();
        {
            use crate::schema::purchases::dsl::*;

            diesel::update(purchases.filter(id.eq(&purchase.id)))
                .set((
                    status.eq(PurchaseStatus::Completed),
                    gateway_payment_id.eq(Some(payment_id)),
                    updated_at.eq(now),
                ))
                .execute(conn)?;
        }

        record_enrollment(conn, &purchase.user_id, &purchase.course_id)?;

        tracing::info!(
            order_id,
            payment_id,
            purchase_id = %purchase.id,
            "Payment completed"
        );

        Ok(CompletionOutcome::Completed(Purchase {
            status: PurchaseStatus::Completed,
            gateway_payment_id: Some(payment_id.to_string()),
            updated_at: now,
            ..purchase
        }))
    })
}

/// Record a failed payment attempt. Only `created` purchases change state.
pub fn mark_purchase_failed(
    conn: &mut SqliteConnection,
    order_id: &str,
) -> AppResult<FailureOutcome> {
    conn.immediate_transaction(|conn| {
        let purchase = find_purchase_by_order(conn, order_id)?
            .ok_or_else(|| AppError::NotFound("Purchase".to_string()))?;

        if purchase.status != PurchaseStatus::Created {
            return Ok(FailureOutcome::Unchanged(purchase));
        }

        let now = chrono::Utc::now().naive_utc();
        {
            use crate::schema::purchases::dsl::*;

            diesel::update(purchases.filter(id.eq(&purchase.id)))
                .set((status.eq(PurchaseStatus::Failed), updated_at.eq(now)))
                .execute(conn)?;
        }

        tracing::info!(order_id, purchase_id = %purchase.id, "Payment failed");

        Ok(FailureOutcome::MarkedFailed(Purchase {
            status: PurchaseStatus::Failed,
            updated_at: now,
            ..purchase
        }))
    })
}
