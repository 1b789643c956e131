/// Every order is charged in Indian rupees
pub const CURRENCY: &str = "INR";

/// Razorpay caps receipts at 40 characters
pub const RECEIPT_MAX_LEN: usize = 40;

pub const PAYMENT_SIGNATURE_HEADER: &str = "x-razorpay-signature";
