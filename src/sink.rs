//! Output persistence: annotated frames (PNG/JPEG for stills, animated GIF
//! for streams) and the annotation batch as pretty JSON next to the image
//! output.

use std::fs::{self, File};
use std::io::{self, BufWriter};
use std::path::{Path, PathBuf};

use image::codecs::gif::GifEncoder;

use crate::annotate::Annotation;
use crate::error::{Error, Result};
use crate::types::Frame;

pub struct Sink {
    image_path: PathBuf,
    json_path: PathBuf,
    write_image: bool,
    write_json: bool,
    streaming: bool,
    gif: Option<GifEncoder<BufWriter<File>>>,
    frames_written: u64,
}

impl Sink {
    /// `streaming` selects animated-GIF output; otherwise every pushed frame
    /// overwrites the single image at `output`. The JSON batch lands at the
    /// same path with a `.json` extension.
    pub fn new(output: &Path, write_image: bool, write_json: bool, streaming: bool) -> Self {
        Self {
            image_path: output.to_path_buf(),
            json_path: output.with_extension("json"),
            write_image,
            write_json,
            streaming,
            gif: None,
            frames_written: 0,
        }
    }

    pub fn push_frame(&mut self, frame: &Frame) -> Result<()> {
        if !self.write_image {
            return Ok(());
        }
        let image = frame
            .to_image()
            .ok_or_else(|| Error::persistence(&self.image_path, io::Error::other("frame buffer size mismatch")))?;

        if self.streaming {
            if self.gif.is_none() {
                ensure_parent(&self.image_path)?;
                let file = File::create(&self.image_path)
                    .map_err(|err| Error::persistence(&self.image_path, err))?;
                self.gif = Some(GifEncoder::new(BufWriter::new(file)));
            }
            if let Some(encoder) = self.gif.as_mut() {
                encoder
                    .encode_frame(image::Frame::new(image))
                    .map_err(|err| Error::persistence(&self.image_path, io::Error::other(err)))?;
            }
        } else {
            ensure_parent(&self.image_path)?;
            image
                .save(&self.image_path)
                .map_err(|err| Error::persistence(&self.image_path, io::Error::other(err)))?;
        }
        self.frames_written += 1;
        Ok(())
    }

    /// Flushes the image stream and writes the JSON batch. An empty batch
    /// still produces a valid `[]` document.
    pub fn finish(mut self, records: &[Annotation]) -> Result<()> {
        if let Some(encoder) = self.gif.take() {
            drop(encoder);
        }
        if self.frames_written > 0 {
            log::info!(
                "wrote {} frame(s) to {}",
                self.frames_written,
                self.image_path.display()
            );
        }

        if self.write_json {
            ensure_parent(&self.json_path)?;
            let body = serde_json::to_string_pretty(records)
                .map_err(|err| Error::persistence(&self.json_path, io::Error::other(err)))?;
            fs::write(&self.json_path, body)
                .map_err(|err| Error::persistence(&self.json_path, err))?;
            log::info!(
                "wrote {} annotation(s) to {}",
                records.len(),
                self.json_path.display()
            );
        }
        Ok(())
    }
}

fn ensure_parent(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent).map_err(|err| Error::persistence(parent, err))?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::RgbaImage;

    fn record(number: u32) -> Annotation {
        Annotation {
            number,
            box_cx: 0.5,
            box_cy: 0.5,
            box_w: 0.1,
            box_h: 0.1,
            label: Some("nothing".into()),
            score: 1.0,
            rotation: 0.0,
        }
    }

    #[test]
    fn json_only_mode_writes_json_and_creates_directories() {
        let dir = tempfile::tempdir().unwrap();
        let output = dir.path().join("nested/out/result.png");

        let mut sink = Sink::new(&output, false, true, false);
        let frame = Frame::from_image(RgbaImage::new(4, 4), 0);
        sink.push_frame(&frame).unwrap();
        sink.finish(&[record(1), record(2)]).unwrap();

        assert!(!output.exists());
        let json_path = output.with_extension("json");
        assert!(json_path.exists());

        let parsed: Vec<Annotation> =
            serde_json::from_str(&fs::read_to_string(json_path).unwrap()).unwrap();
        assert_eq!(parsed.len(), 2);
        assert_eq!(parsed[1].number, 2);
    }

    #[test]
    fn still_mode_saves_a_png() {
        let dir = tempfile::tempdir().unwrap();
        let output = dir.path().join("annotated.png");

        let mut sink = Sink::new(&output, true, false, false);
        let frame = Frame::from_image(
            RgbaImage::from_pixel(8, 8, image::Rgba([0, 255, 0, 255])),
            0,
        );
        sink.push_frame(&frame).unwrap();
        sink.finish(&[]).unwrap();

        assert!(output.exists());
        assert!(!output.with_extension("json").exists());
        let reloaded = image::open(&output).unwrap().to_rgba8();
        assert_eq!(reloaded.dimensions(), (8, 8));
    }

    #[test]
    fn empty_batch_serializes_to_empty_array() {
        let dir = tempfile::tempdir().unwrap();
        let output = dir.path().join("empty.png");

        let sink = Sink::new(&output, false, true, true);
        sink.finish(&[]).unwrap();

        let body = fs::read_to_string(output.with_extension("json")).unwrap();
        assert_eq!(body.trim(), "[]");
    }

    #[test]
    fn stream_mode_encodes_a_gif() {
        let dir = tempfile::tempdir().unwrap();
        let output = dir.path().join("clip.gif");

        let mut sink = Sink::new(&output, true, false, true);
        for i in 0..2 {
            let frame = Frame::from_image(
                RgbaImage::from_pixel(6, 6, image::Rgba([i * 100, 0, 0, 255])),
                i as u64,
            );
            sink.push_frame(&frame).unwrap();
        }
        sink.finish(&[]).unwrap();

        assert!(output.exists());
        assert!(fs::metadata(&output).unwrap().len() > 0);
    }
}
