use super::{Backdrop, Phase};

impl Backdrop {
    /// Releases every owned resource, in order: stop the frame loop,
    /// terminate the geometry source, drop the bloom stage, drop the
    /// particle pass (geometry and uniform buffers), drop the surface.
    ///
    /// Each step is isolated: a failure is logged and never prevents the
    /// remaining steps from running. Safe to call any number of times;
    /// after the first the backdrop is in the terminal disposed state and
    /// every other entry point is a no-op.
    pub fn dispose(&mut self) {
        if self.phase == Phase::Disposed {
            return;
        }

        self.stop();

        // Tolerates a thread that already finished or panicked; failures
        // are logged inside terminate().
        if let Some(mut source) = self.source.take() {
            source.terminate();
        }

        // The stage may already be absent (construction failed, or the
        // governor dropped it); both passes and targets release together.
        if self.bloom.take().is_some() {
            log::debug!("bloom stage released");
        }

        if self.pass.take().is_some() {
            log::debug!("particle pipeline and buffers released");
        }

        self.particles = None;

        // Dropping the surface releases the swapchain; the device handle
        // itself goes with the Backdrop value.
        self.surface = None;

        self.phase = Phase::Disposed;
        log::info!("backdrop disposed");
    }
}

impl Drop for Backdrop {
    fn drop(&mut self) {
        self.dispose();
    }
}
