//! Serialized execution of cart operations.
//!
//! Every write goes through one worker task per shopper, so at most one
//! platform call for a cart is in flight at any time and each mutation sees the
//! cart version produced by the previous one.

use std::sync::Arc;
use std::time::Duration;

use boba_core::{Cart, LineItemId, Market, ProductId, VariantId};
use tokio::sync::{mpsc, oneshot};
use tracing::{Instrument, debug, info_span, warn};
use uuid::Uuid;

use super::{CartError, CartMutation, CartSession};
use crate::commerce::CartRemote;

type Reply = oneshot::Sender<Result<Arc<Cart>, CartError>>;

enum Command {
    Resolve,
    Refresh,
    Mutate(CartMutation),
}

impl Command {
    const fn name(&self) -> &'static str {
        match self {
            Self::Resolve => "resolve",
            Self::Refresh => "refresh",
            Self::Mutate(mutation) => mutation.name(),
        }
    }
}

struct Job {
    id: Uuid,
    command: Command,
    reply: Reply,
}

/// Handle to a shopper's cart.
///
/// Cheap to clone. Operations are queued in the order their futures are first
/// polled and run one at a time; each gets `operation_timeout` to finish. A
/// timed-out operation fails with [`CartError::Timeout`] and the queue moves
/// on. The worker exits once every handle is dropped, or after an operation
/// finds the platform session lost; the handle then reports
/// [`is_closed`](Self::is_closed) and every further operation fails with
/// [`CartError::QueueClosed`].
///
/// Dropping an operation's future does not cancel it; queued work still runs.
pub struct CartHandle<R> {
    session: Arc<CartSession<R>>,
    jobs: mpsc::UnboundedSender<Job>,
}

impl<R> Clone for CartHandle<R> {
    fn clone(&self) -> Self {
        Self {
            session: Arc::clone(&self.session),
            jobs: self.jobs.clone(),
        }
    }
}

impl<R: CartRemote> CartHandle<R> {
    /// Start the worker for `session`. Must be called within a Tokio runtime.
    #[must_use]
    pub fn spawn(session: CartSession<R>, operation_timeout: Duration) -> Self {
        let session = Arc::new(session);
        let (jobs, receiver) = mpsc::unbounded_channel();
        tokio::spawn(run(Arc::clone(&session), receiver, operation_timeout));
        Self { session, jobs }
    }

    /// The market this cart is reconciled against.
    #[must_use]
    pub fn market(&self) -> &Market {
        self.session.market()
    }

    /// Whether the worker has stopped.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.jobs.is_closed()
    }

    /// The cached cart, without touching the platform or the queue.
    pub async fn cached(&self) -> Option<Arc<Cart>> {
        self.session.cached().await
    }

    /// Return the cart, resolving it on first use.
    ///
    /// Cache hits return immediately. Misses are queued, so concurrent first
    /// calls resolve the cart once.
    ///
    /// # Errors
    ///
    /// Returns an error if resolution fails or times out.
    pub async fn get_or_create_cart(&self) -> Result<Arc<Cart>, CartError> {
        if !self.is_closed()
            && let Some(cart) = self.session.cached().await
        {
            return Ok(cart);
        }
        self.enqueue(Command::Resolve).await
    }

    /// Re-resolve the cart from the platform.
    ///
    /// # Errors
    ///
    /// Returns an error if resolution fails or times out.
    pub async fn refresh(&self) -> Result<Arc<Cart>, CartError> {
        self.enqueue(Command::Refresh).await
    }

    /// Add `quantity` units of a product variant.
    ///
    /// # Errors
    ///
    /// Returns [`CartError::InvalidQuantity`] for zero, or the platform error.
    pub async fn add_to_cart(
        &self,
        product_id: ProductId,
        variant_id: VariantId,
        quantity: u32,
    ) -> Result<Arc<Cart>, CartError> {
        self.mutate(CartMutation::AddLineItem {
            product_id,
            variant_id,
            quantity,
        })
        .await
    }

    /// Set a line's quantity; zero removes it.
    ///
    /// # Errors
    ///
    /// Returns [`CartError::LineItemNotFound`] for unknown lines, or the
    /// platform error.
    pub async fn change_quantity(
        &self,
        line_item_id: LineItemId,
        quantity: u32,
    ) -> Result<Arc<Cart>, CartError> {
        self.mutate(CartMutation::ChangeLineItemQuantity {
            line_item_id,
            quantity,
        })
        .await
    }

    /// Remove a line.
    ///
    /// # Errors
    ///
    /// Returns [`CartError::LineItemNotFound`] for unknown lines, or the
    /// platform error.
    pub async fn remove_line_item(&self, line_item_id: LineItemId) -> Result<Arc<Cart>, CartError> {
        self.mutate(CartMutation::RemoveLineItem { line_item_id })
            .await
    }

    /// Apply a discount code.
    ///
    /// # Errors
    ///
    /// Returns [`CartError::InvalidDiscountCode`] for blank codes, or the
    /// platform error (unknown codes are rejected by the platform).
    pub async fn apply_discount(&self, code: String) -> Result<Arc<Cart>, CartError> {
        self.mutate(CartMutation::AddDiscountCode { code }).await
    }

    /// Remove an applied discount code by resource ID or code.
    ///
    /// # Errors
    ///
    /// Returns [`CartError::DiscountNotApplied`] when the cart has no such
    /// code, or the platform error.
    pub async fn remove_discount(&self, code: String) -> Result<Arc<Cart>, CartError> {
        self.mutate(CartMutation::RemoveDiscountCode { code }).await
    }

    /// Remove every line.
    ///
    /// # Errors
    ///
    /// Returns the platform error.
    pub async fn clear(&self) -> Result<Arc<Cart>, CartError> {
        self.mutate(CartMutation::Clear).await
    }

    async fn mutate(&self, mutation: CartMutation) -> Result<Arc<Cart>, CartError> {
        // Reject obviously bad input before it takes a place in the queue
        mutation.validate()?;
        self.enqueue(Command::Mutate(mutation)).await
    }

    /// Queue a command and wait for its result.
    ///
    /// The job is sent before the first suspension point, which fixes the
    /// order of concurrently started operations.
    async fn enqueue(&self, command: Command) -> Result<Arc<Cart>, CartError> {
        let (reply, result) = oneshot::channel();
        let job = Job {
            id: Uuid::new_v4(),
            command,
            reply,
        };
        self.jobs.send(job).map_err(|_| CartError::QueueClosed)?;
        result.await.map_err(|_| CartError::QueueClosed)?
    }
}

async fn run<R: CartRemote>(
    session: Arc<CartSession<R>>,
    mut jobs: mpsc::UnboundedReceiver<Job>,
    operation_timeout: Duration,
) {
    while let Some(job) = jobs.recv().await {
        let span = info_span!("cart_job", job_id = %job.id, operation = job.command.name());
        let result = execute(&session, job.command, operation_timeout)
            .instrument(span)
            .await;
        let session_lost = matches!(&result, Err(err) if err.is_session_lost());
        // The caller may have stopped waiting; the work is done either way
        let _ = job.reply.send(result);
        if session_lost {
            warn!("Platform session lost, closing cart queue");
            break;
        }
    }
    debug!("Cart queue closed");
}

async fn execute<R: CartRemote>(
    session: &CartSession<R>,
    command: Command,
    operation_timeout: Duration,
) -> Result<Arc<Cart>, CartError> {
    let operation = async {
        match &command {
            Command::Resolve => session.get_or_create_cart().await,
            Command::Refresh => session.refresh().await,
            Command::Mutate(mutation) => session.apply(mutation).await,
        }
    };

    let result = tokio::time::timeout(operation_timeout, operation)
        .await
        .unwrap_or_else(|_| Err(CartError::Timeout(operation_timeout)));

    if let Err(err) = &result {
        if err.is_client_error() {
            debug!(error = %err, "Cart operation rejected");
        } else {
            warn!(error = %err, "Cart operation failed");
        }
    }
    result
}
