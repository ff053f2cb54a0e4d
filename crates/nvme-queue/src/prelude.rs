//! Prelude for the queue data model.
//!
//! ```
//! use nvme_queue::prelude::*;
//!
//! let registry = StaticQueueRegistry::new().with_queue(1, PriorityClass::High, 3);
//! assert_eq!(registry.outstanding_in_class(PriorityClass::High), 3);
//! ```

pub use crate::{
    ADMIN_QUEUE_ID, ArbitrationMechanism, ArbitrationTrace, ArbitrationWeights, CQ_ENTRY_SIZE,
    CompletionEntry, DeviceInterface, PriorityClass, QueueBinding, QueueId, QueueRegistry,
    StaticQueueRegistry,
};
