//! Presentation layers that register with the [`LibraryService`].

use crate::LibraryService;
use crate::error::Result;
use async_trait::async_trait;

/// Something that presents the library to a user.
pub trait View {
    /// Used for logging.
    fn name(&self) -> &str;

    /// The view's startup hook, if it has one.
    ///
    /// [`LibraryService::run()`] calls it exactly once.
    fn startup(&mut self) -> Option<&mut dyn Startup> {
        None
    }
}

/// Work a [`View`] does once, when the service starts running.
#[async_trait(?Send)]
pub trait Startup {
    async fn start(&mut self, service: &mut LibraryService) -> Result<()>;
}
