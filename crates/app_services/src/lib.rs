//! Application services for the utilization fee ledger
//!
//! This crate wires the domain crates to persistence and notification:
//!
//! - **Ports**: `FeeStore` reads and opens `FeeUnitOfWork`s that lock the
//!   company's account for the duration of one operation
//! - **Services**: `LedgerService`, `CalculationService`, `RefundService`
//!   and `CorrectionService` check the caller's role, run the domain
//!   transition and its postings in one unit of work, then notify
//! - **Adapters**: `InMemoryFeeStore` and the notification sinks
//!
//! # Example
//!
//! ```rust,ignore
//! use app_services::{FeeServices, InMemoryFeeStore, Notifier};
//!
//! let services = FeeServices::new(Arc::new(InMemoryFeeStore::new()), Notifier::tracing());
//! let calc = services.calculations.approve(&reviewer, calculation_id, None).await?;
//! ```

pub mod actor;
pub mod calculation;
pub mod correction;
pub mod error;
pub mod ledger;
pub mod memory;
pub mod notification;
pub mod ports;
pub mod refund;

use std::sync::Arc;

pub use actor::{Actor, Role};
pub use calculation::CalculationService;
pub use correction::CorrectionService;
pub use error::ServiceError;
pub use ledger::{AccountSummary, LedgerService};
pub use memory::InMemoryFeeStore;
pub use notification::{Audience, ChannelSink, Notification, NotificationSink, Notifier, Severity, TracingSink};
pub use ports::{AccountQuery, CalculationQuery, FeeStore, FeeUnitOfWork, Page, ReviewQuery};
pub use refund::RefundService;

/// Every service over one store and notifier
#[derive(Clone)]
pub struct FeeServices {
    pub store: Arc<dyn FeeStore>,
    pub ledger: LedgerService,
    pub calculations: CalculationService,
    pub refunds: RefundService,
    pub corrections: CorrectionService,
}

impl FeeServices {
    pub fn new(store: Arc<dyn FeeStore>, notifier: Notifier) -> Self {
        Self {
            ledger: LedgerService::new(Arc::clone(&store)),
            calculations: CalculationService::new(Arc::clone(&store), notifier.clone()),
            refunds: RefundService::new(Arc::clone(&store), notifier.clone()),
            corrections: CorrectionService::new(Arc::clone(&store), notifier),
            store,
        }
    }
}
