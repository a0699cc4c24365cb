#![deny(unsafe_code)]

//! Chat controllers for parley: the dashboard, the login flow and per-chatroom
//! sessions, all driven by a virtual-time [`Scheduler`].

pub mod clock;
pub mod countries;
pub mod dashboard;
/// Effects and notices controllers hand to the presentation layer.
pub mod events;
pub mod header;
pub mod image;
pub mod login;
/// History windowing and filler backfill.
pub mod pagination;
pub mod scheduler;
pub mod session;
pub mod timings;

pub use clock::{Clock, ManualClock, SystemClock};
pub use countries::{
    Country, CountryError, CountrySource, JsonFileCountrySource, UnconfiguredCountrySource,
    normalize_countries,
};
pub use dashboard::{Dashboard, DashboardError, DashboardTask};
pub use events::{FieldError, Notice, NoticeLevel, ViewEffect};
pub use header::HeaderState;
pub use image::{ImageError, read_image_data_uri};
pub use login::{LoginFlow, LoginStep, LoginTask};
pub use pagination::{PAGE_SIZE, PageWindow, PaginationEngine};
pub use scheduler::{Scheduler, TimerDriven, TimerId};
pub use session::{ChatroomSession, SendOutcome, SessionTask};
pub use timings::Timings;
