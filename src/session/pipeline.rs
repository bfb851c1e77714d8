//! Capture session bookkeeping, configuration brackets and device locks

use crate::errors::CameraError;
use crate::platform::{
    CaptureBackend, CaptureConnection, CaptureDevice, ImageCodec, StillImageCompletion,
};
use crate::types::{MediaType, SessionPreset};
use std::ops::{Deref, DerefMut};

/// Active capture pipeline: at most one video input and one still-image
/// output over a platform backend.
///
/// Inputs and outputs can only be changed through a [`ConfigurationBracket`],
/// which holds the session exclusively until it commits.
pub struct CaptureSession {
    backend: Box<dyn CaptureBackend>,
    input: Option<String>,
    output: Option<ImageCodec>,
}

impl CaptureSession {
    pub fn new(mut backend: Box<dyn CaptureBackend>, preset: SessionPreset) -> Self {
        backend.set_preset(preset);
        Self {
            backend,
            input: None,
            output: None,
        }
    }

    pub fn backend_name(&self) -> &str {
        self.backend.name()
    }

    /// Open a configuration bracket; changes are committed when the bracket
    /// is committed or dropped
    pub fn configure(&mut self) -> ConfigurationBracket<'_> {
        self.backend.begin_configuration();
        ConfigurationBracket {
            session: self,
            committed: false,
        }
    }

    pub fn devices(
        &mut self,
        media: MediaType,
    ) -> Result<Vec<Box<dyn CaptureDevice>>, CameraError> {
        self.backend.devices(media)
    }

    pub fn input_id(&self) -> Option<&str> {
        self.input.as_deref()
    }

    pub fn input_count(&self) -> usize {
        usize::from(self.input.is_some())
    }

    pub fn output_count(&self) -> usize {
        usize::from(self.output.is_some())
    }

    pub fn is_running(&self) -> bool {
        self.backend.is_running()
    }

    /// Start the pipeline; a no-op when already running
    pub fn start_running(&mut self) -> Result<(), CameraError> {
        if self.backend.is_running() {
            return Ok(());
        }
        self.backend.start_running()
    }

    pub fn stop_running(&mut self) {
        if self.backend.is_running() {
            self.backend.stop_running();
        }
    }

    /// First output connection carrying video
    pub fn video_connection(&self) -> Option<CaptureConnection> {
        self.output?;
        self.backend
            .output_connections()
            .into_iter()
            .find(|c| c.carries(MediaType::Video))
    }

    pub fn capture_still_image(
        &mut self,
        connection: &CaptureConnection,
        completion: StillImageCompletion,
    ) {
        self.backend.capture_still_image(connection, completion);
    }
}

/// Begin/commit pair around session input and output changes
pub struct ConfigurationBracket<'a> {
    session: &'a mut CaptureSession,
    committed: bool,
}

impl ConfigurationBracket<'_> {
    /// Bind `device` as the video input. The previous input must have been
    /// removed first.
    pub fn add_input(&mut self, device: &dyn CaptureDevice) -> Result<(), CameraError> {
        if let Some(current) = &self.session.input {
            return Err(CameraError::InitializationError(format!(
                "Input {} is still bound",
                current
            )));
        }
        if !self.session.backend.can_add_input(device) {
            return Err(CameraError::InitializationError(format!(
                "Session cannot add input {}",
                device.unique_id()
            )));
        }
        self.session.backend.add_input(device)?;
        self.session.input = Some(device.unique_id().to_string());
        Ok(())
    }

    /// Unbind the current input, returning its device id
    pub fn remove_input(&mut self) -> Option<String> {
        let id = self.session.input.take()?;
        self.session.backend.remove_input(&id);
        Some(id)
    }

    pub fn add_still_image_output(&mut self) -> Result<(), CameraError> {
        if self.session.output.is_some() {
            return Ok(());
        }
        self.session.backend.add_still_image_output(ImageCodec::Jpeg)?;
        self.session.output = Some(ImageCodec::Jpeg);
        Ok(())
    }

    pub fn commit(mut self) {
        self.finish();
    }

    fn finish(&mut self) {
        if !self.committed {
            self.session.backend.commit_configuration();
            self.committed = true;
        }
    }
}

impl Drop for ConfigurationBracket<'_> {
    fn drop(&mut self) {
        self.finish();
    }
}

/// Exclusive configuration access to a device, released on drop
pub struct DeviceLock<'a, D: CaptureDevice + ?Sized> {
    device: &'a mut D,
}

impl<'a, D: CaptureDevice + ?Sized> DeviceLock<'a, D> {
    pub fn acquire(device: &'a mut D) -> Result<Self, CameraError> {
        device.lock_for_configuration()?;
        Ok(Self { device })
    }
}

impl<D: CaptureDevice + ?Sized> Deref for DeviceLock<'_, D> {
    type Target = D;

    fn deref(&self) -> &D {
        self.device
    }
}

impl<D: CaptureDevice + ?Sized> DerefMut for DeviceLock<'_, D> {
    fn deref_mut(&mut self) -> &mut D {
        self.device
    }
}

impl<D: CaptureDevice + ?Sized> Drop for DeviceLock<'_, D> {
    fn drop(&mut self) {
        self.device.unlock_for_configuration();
    }
}
