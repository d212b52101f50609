use std::io::{ErrorKind, Read, Write};
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::sync::mpsc;
use std::thread::{self, JoinHandle};

use anyhow::{anyhow, bail, Context, Result};

use crate::settings::RenderSettings;

/// Pipes raw RGBA frames into an ffmpeg process on a dedicated writer
/// thread. Frames are encoded in the order they are written.
pub struct FfmpegPipe {
    sender: Option<mpsc::SyncSender<Vec<u8>>>,
    worker: Option<JoinHandle<Result<()>>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FfmpegMode {
    Auto,
    System,
    Sidecar,
}

trait EncoderBackend: Send {
    fn mode_label(&self) -> &'static str;
    fn run(self: Box<Self>, receiver: mpsc::Receiver<Vec<u8>>) -> Result<()>;
}

#[derive(Clone)]
struct EncodeJob {
    size: String,
    fps: String,
    output_path: PathBuf,
}

struct SystemFfmpegBackend {
    job: EncodeJob,
}

#[cfg(feature = "sidecar_ffmpeg")]
struct SidecarFfmpegBackend {
    job: EncodeJob,
}

impl FfmpegPipe {
    pub fn spawn(settings: &RenderSettings, output_path: &Path, mode: FfmpegMode) -> Result<Self> {
        let job = EncodeJob {
            size: format!("{}x{}", settings.width, settings.height),
            fps: settings.fps.to_string(),
            output_path: output_path.to_path_buf(),
        };

        let (sender, receiver) = mpsc::sync_channel::<Vec<u8>>(4);
        let backend = select_backend(mode, job)?;
        let worker = thread::Builder::new()
            .name(format!("textreel-encoder-{}", backend.mode_label()))
            .spawn(move || backend.run(receiver))
            .context("failed to spawn ffmpeg writer thread")?;

        Ok(Self {
            sender: Some(sender),
            worker: Some(worker),
        })
    }

    pub fn write_frame(&self, rgba_frame: Vec<u8>) -> Result<()> {
        let sender = self
            .sender
            .as_ref()
            .ok_or_else(|| anyhow!("encoder has already been finalized"))?;
        sender
            .send(rgba_frame)
            .map_err(|_| anyhow!("failed to enqueue frame for ffmpeg"))
    }

    /// Closes the stream and waits for ffmpeg to finish the file.
    pub fn finish(mut self) -> Result<()> {
        drop(self.sender.take());

        let handle = self
            .worker
            .take()
            .ok_or_else(|| anyhow!("ffmpeg worker thread missing"))?;
        match handle.join() {
            Ok(result) => result,
            Err(_) => Err(anyhow!("ffmpeg worker thread panicked")),
        }
    }
}

fn select_backend(mode: FfmpegMode, job: EncodeJob) -> Result<Box<dyn EncoderBackend>> {
    match mode {
        FfmpegMode::Auto | FfmpegMode::System => Ok(Box::new(SystemFfmpegBackend { job })),
        FfmpegMode::Sidecar => {
            #[cfg(feature = "sidecar_ffmpeg")]
            {
                Ok(Box::new(SidecarFfmpegBackend { job }))
            }
            #[cfg(not(feature = "sidecar_ffmpeg"))]
            {
                let _ = job;
                Err(anyhow!(
                    "sidecar encoder requested but textreel was built without `sidecar_ffmpeg`. Rebuild with `--features sidecar_ffmpeg`."
                ))
            }
        }
    }
}

impl EncoderBackend for SystemFfmpegBackend {
    fn mode_label(&self) -> &'static str {
        "system"
    }

    fn run(self: Box<Self>, receiver: mpsc::Receiver<Vec<u8>>) -> Result<()> {
        run_ffmpeg_process(Path::new("ffmpeg"), receiver, &self.job, self.mode_label())
    }
}

#[cfg(feature = "sidecar_ffmpeg")]
impl EncoderBackend for SidecarFfmpegBackend {
    fn mode_label(&self) -> &'static str {
        "sidecar"
    }

    fn run(self: Box<Self>, receiver: mpsc::Receiver<Vec<u8>>) -> Result<()> {
        let path = ffmpeg_sidecar::paths::ffmpeg_path();
        if !path.exists() {
            ffmpeg_sidecar::download::auto_download()
                .context("failed to auto-download ffmpeg sidecar binary")?;
        }
        run_ffmpeg_process(&path, receiver, &self.job, self.mode_label())
    }
}

fn run_ffmpeg_process(
    ffmpeg_path: &Path,
    receiver: mpsc::Receiver<Vec<u8>>,
    job: &EncodeJob,
    mode_label: &str,
) -> Result<()> {
    let args = ffmpeg_args(job);
    let mut command = Command::new(ffmpeg_path);
    command
        .args(args.iter().map(String::as_str))
        .stdin(Stdio::piped())
        .stdout(Stdio::null())
        .stderr(Stdio::piped());

    let mut child = command.spawn().map_err(|error| {
        if error.kind() == ErrorKind::NotFound {
            anyhow!(
                "ffmpeg executable not found (mode={mode_label}, resolved_path={}). Install ffmpeg (e.g. `apt install ffmpeg` or `brew install ffmpeg`), or build with `--features sidecar_ffmpeg` for a managed binary.",
                ffmpeg_path.display()
            )
        } else {
            anyhow!(
                "failed to spawn ffmpeg process (mode={mode_label}, resolved_path={}, args='{}'): {error}",
                ffmpeg_path.display(),
                args.join(" ")
            )
        }
    })?;

    let mut stdin = child
        .stdin
        .take()
        .ok_or_else(|| anyhow!("failed to capture ffmpeg stdin"))?;
    let mut stderr_pipe = child.stderr.take();

    while let Ok(frame) = receiver.recv() {
        stdin
            .write_all(&frame)
            .context("failed to write frame to ffmpeg stdin")?;
    }

    stdin.flush().context("failed to flush ffmpeg stdin")?;
    drop(stdin);

    let status = child.wait().context("failed waiting for ffmpeg process")?;
    let stderr_tail = read_stderr_tail(&mut stderr_pipe)?;
    if !status.success() {
        bail!(
            "ffmpeg failed with status {status} (mode={mode_label}, resolved_path={}, args='{}', stderr_tail='{}')",
            ffmpeg_path.display(),
            args.join(" "),
            stderr_tail
        );
    }

    Ok(())
}

fn ffmpeg_args(job: &EncodeJob) -> Vec<String> {
    let mut args = ffmpeg_rawvideo_input_args(&job.size, &job.fps);
    args.extend(ffmpeg_h264_output_args());
    args.extend(ffmpeg_container_output_args(&job.output_path));
    args.push(job.output_path.to_string_lossy().into_owned());
    args
}

pub fn ffmpeg_rawvideo_input_args(size: &str, fps: &str) -> Vec<String> {
    vec![
        "-hide_banner".to_owned(),
        "-loglevel".to_owned(),
        "error".to_owned(),
        "-y".to_owned(),
        "-f".to_owned(),
        "rawvideo".to_owned(),
        "-pix_fmt".to_owned(),
        "rgba".to_owned(),
        "-s:v".to_owned(),
        size.to_owned(),
        "-r".to_owned(),
        fps.to_owned(),
        "-i".to_owned(),
        "-".to_owned(),
        "-an".to_owned(),
    ]
}

pub fn ffmpeg_h264_output_args() -> Vec<String> {
    vec![
        "-c:v".to_owned(),
        "libx264".to_owned(),
        "-preset".to_owned(),
        "medium".to_owned(),
        "-crf".to_owned(),
        "18".to_owned(),
        "-pix_fmt".to_owned(),
        "yuv420p".to_owned(),
    ]
}

pub fn ffmpeg_container_output_args(output_path: &Path) -> Vec<String> {
    let ext = output_path
        .extension()
        .and_then(|ext| ext.to_str())
        .unwrap_or_default()
        .to_ascii_lowercase();
    if matches!(ext.as_str(), "mp4" | "m4v" | "mov") {
        vec!["-movflags".to_owned(), "+faststart".to_owned()]
    } else {
        Vec::new()
    }
}

fn read_stderr_tail(stderr: &mut Option<std::process::ChildStderr>) -> Result<String> {
    let Some(mut pipe) = stderr.take() else {
        return Ok(String::new());
    };
    let mut buf = Vec::new();
    pipe.read_to_end(&mut buf)
        .context("failed reading ffmpeg stderr")?;
    let text = String::from_utf8_lossy(&buf).to_string();
    Ok(last_n_chars(&text, 500))
}

fn last_n_chars(s: &str, max_chars: usize) -> String {
    let mut chars = s.chars().collect::<Vec<_>>();
    if chars.len() > max_chars {
        chars = chars[chars.len().saturating_sub(max_chars)..].to_vec();
    }
    chars.into_iter().collect::<String>().trim().to_owned()
}

#[cfg(test)]
mod tests {
    use std::path::Path;

    use super::{
        ffmpeg_container_output_args, ffmpeg_h264_output_args, ffmpeg_rawvideo_input_args,
        last_n_chars,
    };

    #[test]
    fn rawvideo_input_args_carry_geometry() {
        let args = ffmpeg_rawvideo_input_args("1920x1080", "30");
        let joined = args.join(" ");
        assert!(joined.contains("-f rawvideo"));
        assert!(joined.contains("-pix_fmt rgba"));
        assert!(joined.contains("-s:v 1920x1080"));
        assert!(joined.contains("-r 30"));
        assert!(joined.contains("-an"));
    }

    #[test]
    fn h264_output_targets_yuv420p() {
        let joined = ffmpeg_h264_output_args().join(" ");
        assert!(joined.contains("-c:v libx264"));
        assert!(joined.contains("-pix_fmt yuv420p"));
    }

    #[test]
    fn faststart_only_for_mp4_family() {
        assert_eq!(
            ffmpeg_container_output_args(Path::new("out.mp4")),
            vec!["-movflags".to_owned(), "+faststart".to_owned()]
        );
        assert!(ffmpeg_container_output_args(Path::new("out.mkv")).is_empty());
        assert!(ffmpeg_container_output_args(Path::new("out")).is_empty());
    }

    #[test]
    fn stderr_tail_keeps_the_end() {
        let text = "x".repeat(600) + " tail marker";
        let tail = last_n_chars(&text, 500);
        assert!(tail.ends_with("tail marker"));
        assert_eq!(tail.chars().count(), 500);
    }
}
