//! Customer feedback: moderated property reviews and support tickets.

pub mod reviews;
pub mod tickets;

use axum::Router;

use crate::http::AppContext;

pub use reviews::{average_rating, rating_summary, RatingSummary, Review, ReviewStatus};
pub use tickets::{Ticket, TicketPriority, TicketReply, TicketStatus};

pub fn routes() -> Router<AppContext> {
    Router::new()
        .merge(reviews::routes())
        .merge(tickets::routes())
}
