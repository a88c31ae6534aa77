//! Frame acquisition. A [`FrameSource`] turns one CLI input argument (image
//! path, animation path or camera index) into a uniform stream of RGBA
//! frames with 0-based sequence indices.

use std::collections::VecDeque;
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use image::codecs::gif::GifDecoder;
use image::codecs::png::PngDecoder;
use image::{AnimationDecoder, Frames, RgbaImage};

use crate::error::{Error, Result};
use crate::types::Frame;

/// What kind of input the source was opened from. Streaming sinks and the
/// viewer behave differently for live capture than for finite files.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SourceMedium {
    Still,
    Animation,
    Camera,
}

pub struct FrameSource {
    medium: SourceMedium,
    inner: Inner,
    next_index: u64,
}

impl std::fmt::Debug for FrameSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FrameSource")
            .field("medium", &self.medium)
            .field("next_index", &self.next_index)
            .finish_non_exhaustive()
    }
}

enum Inner {
    Buffered(VecDeque<RgbaImage>),
    Animation(Frames<'static>),
    #[cfg(feature = "camera-nokhwa")]
    Camera(camera::CameraCapture),
}

impl FrameSource {
    /// Opens an input argument. An unsigned integer selects a camera by
    /// index; anything else is treated as a file path and dispatched on its
    /// extension.
    pub fn open(input: &str) -> Result<Self> {
        if let Ok(index) = input.parse::<u32>() {
            return Self::open_camera(index);
        }
        Self::open_path(Path::new(input))
    }

    pub fn open_path(path: &Path) -> Result<Self> {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_ascii_lowercase)
            .unwrap_or_default();

        match ext.as_str() {
            "png" | "jpg" | "jpeg" => {
                let image = image::open(path)
                    .map_err(|err| {
                        Error::SourceUnavailable(format!("cannot open {}: {err}", path.display()))
                    })?
                    .to_rgba8();
                Ok(Self {
                    medium: SourceMedium::Still,
                    inner: Inner::Buffered(VecDeque::from([image])),
                    next_index: 0,
                })
            }
            "gif" => {
                let reader = open_file(path)?;
                let decoder = GifDecoder::new(reader).map_err(|err| {
                    Error::SourceUnavailable(format!("cannot decode {}: {err}", path.display()))
                })?;
                Ok(Self::from_animation(decoder.into_frames()))
            }
            "apng" => {
                let reader = open_file(path)?;
                let decoder = PngDecoder::new(reader)
                    .and_then(|d| d.apng())
                    .map_err(|err| {
                        Error::SourceUnavailable(format!("cannot decode {}: {err}", path.display()))
                    })?;
                Ok(Self::from_animation(decoder.into_frames()))
            }
            _ => Err(Error::SourceUnavailable(format!(
                "unsupported input format: {}",
                path.display()
            ))),
        }
    }

    #[cfg(feature = "camera-nokhwa")]
    pub fn open_camera(index: u32) -> Result<Self> {
        let capture = camera::CameraCapture::start(index)?;
        Ok(Self {
            medium: SourceMedium::Camera,
            inner: Inner::Camera(capture),
            next_index: 0,
        })
    }

    #[cfg(not(feature = "camera-nokhwa"))]
    pub fn open_camera(_index: u32) -> Result<Self> {
        Err(Error::SourceUnavailable(
            "camera capture support is not compiled in".into(),
        ))
    }

    fn from_animation(frames: Frames<'static>) -> Self {
        Self {
            medium: SourceMedium::Animation,
            inner: Inner::Animation(frames),
            next_index: 0,
        }
    }

    /// Builds a source from pre-decoded frames. Used by tests and by callers
    /// that already hold pixels.
    pub fn from_frames(frames: Vec<RgbaImage>, medium: SourceMedium) -> Self {
        Self {
            medium,
            inner: Inner::Buffered(frames.into()),
            next_index: 0,
        }
    }

    pub fn medium(&self) -> SourceMedium {
        self.medium
    }

    /// True when the source is live capture without a natural end.
    pub fn is_live(&self) -> bool {
        self.medium == SourceMedium::Camera
    }

    /// Next frame in sequence order, or `None` when the source is exhausted.
    /// A decode failure mid-animation ends the stream with an error.
    pub fn next_frame(&mut self) -> Result<Option<Frame>> {
        let image = match &mut self.inner {
            Inner::Buffered(queue) => queue.pop_front(),
            Inner::Animation(frames) => match frames.next() {
                None => None,
                Some(Ok(frame)) => Some(frame.into_buffer()),
                Some(Err(err)) => {
                    return Err(Error::SourceUnavailable(format!(
                        "animation frame decode failed: {err}"
                    )));
                }
            },
            #[cfg(feature = "camera-nokhwa")]
            Inner::Camera(capture) => capture.next_image()?,
        };

        Ok(image.map(|image| {
            let index = self.next_index;
            self.next_index += 1;
            Frame::from_image(image, index)
        }))
    }
}

fn open_file(path: &Path) -> Result<BufReader<File>> {
    File::open(path)
        .map(BufReader::new)
        .map_err(|err| Error::SourceUnavailable(format!("cannot open {}: {err}", path.display())))
}

#[cfg(feature = "camera-nokhwa")]
mod camera {
    use std::{
        sync::{
            Arc,
            atomic::{AtomicBool, Ordering},
        },
        thread,
        time::Duration,
    };

    use crossbeam_channel::{Receiver, RecvTimeoutError, bounded};
    use image::RgbaImage;
    use nokhwa::{
        Camera,
        pixel_format::RgbFormat,
        utils::{CameraIndex, FrameFormat, RequestedFormat, RequestedFormatType},
    };

    use crate::convert;
    use crate::error::{Error, Result};

    const PREFERRED_PIXEL_FORMATS: &[FrameFormat] = &[
        FrameFormat::RAWRGB,
        FrameFormat::RAWBGR,
        FrameFormat::GRAY,
        FrameFormat::YUYV,
        FrameFormat::NV12,
        FrameFormat::MJPEG,
    ];

    fn requested_formats() -> [RequestedFormat<'static>; 4] {
        [
            RequestedFormat::with_formats(
                RequestedFormatType::AbsoluteHighestFrameRate,
                PREFERRED_PIXEL_FORMATS,
            ),
            RequestedFormat::with_formats(
                RequestedFormatType::AbsoluteHighestResolution,
                PREFERRED_PIXEL_FORMATS,
            ),
            // Fall back to any format the backend can decode, preferring
            // higher FPS over very low default rates some drivers expose.
            RequestedFormat::new::<RgbFormat>(RequestedFormatType::AbsoluteHighestFrameRate),
            RequestedFormat::new::<RgbFormat>(RequestedFormatType::None),
        ]
    }

    fn build_camera(index: CameraIndex) -> anyhow::Result<Camera> {
        let mut last_err = None;

        for requested in requested_formats() {
            match Camera::new(index.clone(), requested) {
                Ok(mut camera) => match camera.open_stream() {
                    Ok(()) => return Ok(camera),
                    Err(err) => last_err = Some(err.into()),
                },
                Err(err) => last_err = Some(err.into()),
            }
        }

        Err(last_err
            .unwrap_or_else(|| anyhow::anyhow!("failed to open camera with any supported format")))
    }

    /// Capture thread plus the channel it feeds. The thread drops frames the
    /// consumer has not picked up yet, so the pipeline always works on the
    /// freshest frame.
    pub struct CameraCapture {
        rx: Receiver<RgbaImage>,
        stop: Arc<AtomicBool>,
        handle: Option<thread::JoinHandle<()>>,
    }

    impl CameraCapture {
        pub fn start(index: u32) -> Result<Self> {
            let index = CameraIndex::Index(index);

            // Fail fast before spawning the capture thread.
            build_camera(index.clone())
                .map_err(|err| Error::SourceUnavailable(format!("{err:#}")))?;

            let (tx, rx) = bounded(1);
            let stop = Arc::new(AtomicBool::new(false));
            let stop_flag = stop.clone();

            let handle = thread::spawn(move || {
                let mut camera = match build_camera(index) {
                    Ok(cam) => cam,
                    Err(err) => {
                        log::error!("failed to open camera: {err:?}");
                        return;
                    }
                };

                while !stop_flag.load(Ordering::Relaxed) {
                    let buffer = match camera.frame() {
                        Ok(buffer) => buffer,
                        Err(err) => {
                            log::warn!("camera frame read failed: {err:?}");
                            continue;
                        }
                    };

                    let image = match convert::decode_camera_buffer(&buffer) {
                        Ok(image) => image,
                        Err(err) => {
                            log::warn!("failed to decode camera frame: {err:?}");
                            continue;
                        }
                    };

                    // Drop if the consumer is busy, otherwise forward.
                    let _ = tx.try_send(image);
                }
            });

            Ok(Self {
                rx,
                stop,
                handle: Some(handle),
            })
        }

        pub fn next_image(&mut self) -> Result<Option<RgbaImage>> {
            match self.rx.recv_timeout(Duration::from_secs(5)) {
                Ok(image) => Ok(Some(image)),
                Err(RecvTimeoutError::Disconnected) => Ok(None),
                Err(RecvTimeoutError::Timeout) => Err(Error::SourceUnavailable(
                    "camera produced no frame within 5s".into(),
                )),
            }
        }
    }

    impl Drop for CameraCapture {
        fn drop(&mut self) {
            self.stop.store(true, Ordering::SeqCst);
            if let Some(handle) = self.handle.take() {
                let _ = handle.join();
            }
        }
    }
}
