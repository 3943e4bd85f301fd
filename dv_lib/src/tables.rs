use std::{
    fs::{self, File},
    io::{self, BufWriter, Write},
    path::{Path, PathBuf},
};

use crate::records::{BoundingBox, VideoMeta};

/// A row that can be written to a CSV table with a fixed column order.
pub trait CsvRow {
    const HEADER: &'static [&'static str];

    fn fields(&self) -> Vec<String>;
}

#[derive(Debug, Clone, PartialEq)]
pub struct VideoRow {
    pub video: String,
    pub fps: f64,
    pub frames: u64,
    pub width: u32,
    pub height: u32,
}

impl From<VideoMeta> for VideoRow {
    fn from(meta: VideoMeta) -> Self {
        VideoRow {
            video: meta.video,
            fps: meta.fps,
            frames: meta.frames,
            width: meta.width,
            height: meta.height,
        }
    }
}

impl CsvRow for VideoRow {
    const HEADER: &'static [&'static str] = &["video", "fps", "frames", "width", "height"];

    fn fields(&self) -> Vec<String> {
        vec![
            self.video.clone(),
            float(self.fps),
            self.frames.to_string(),
            self.width.to_string(),
            self.height.to_string(),
        ]
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct FrameRow {
    pub video: String,
    pub frame: u64,
    pub sid: u32,
    pub dval: f64,
    pub hval: f64,
}

impl CsvRow for FrameRow {
    const HEADER: &'static [&'static str] = &["video", "frame", "sid", "dval", "hval"];

    fn fields(&self) -> Vec<String> {
        vec![
            self.video.clone(),
            self.frame.to_string(),
            self.sid.to_string(),
            float(self.dval),
            float(self.hval),
        ]
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShotRow {
    pub video: String,
    pub frame_start: u64,
    pub frame_stop: u64,
    pub sid: u32,
}

impl CsvRow for ShotRow {
    const HEADER: &'static [&'static str] = &["video", "frame_start", "frame_stop", "sid"];

    fn fields(&self) -> Vec<String> {
        vec![
            self.video.clone(),
            self.frame_start.to_string(),
            self.frame_stop.to_string(),
            self.sid.to_string(),
        ]
    }
}

/// Floats keep a fractional part even when whole (`4001.0`, not `4001`).
fn float<F: std::fmt::Debug>(value: F) -> String {
    format!("{value:?}")
}

fn box_fields(bbox: &BoundingBox) -> [String; 4] {
    [
        bbox.top.to_string(),
        bbox.bottom.to_string(),
        bbox.left.to_string(),
        bbox.right.to_string(),
    ]
}

#[derive(Debug, Clone, PartialEq)]
pub struct FaceRow {
    pub video: String,
    pub frame: u64,
    pub sid: u32,
    pub character: String,
    pub bbox: BoundingBox,
    pub score: f32,
    pub overlap: f64,
}

impl CsvRow for FaceRow {
    const HEADER: &'static [&'static str] = &[
        "video", "frame", "sid", "character", "top", "bottom", "left", "right", "score", "overlap",
    ];

    fn fields(&self) -> Vec<String> {
        let mut fields = vec![
            self.video.clone(),
            self.frame.to_string(),
            self.sid.to_string(),
            self.character.clone(),
        ];
        fields.extend(box_fields(&self.bbox));
        fields.push(float(self.score));
        fields.push(float(self.overlap));
        fields
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ObjectRow {
    pub video: String,
    pub frame: u64,
    pub sid: u32,
    pub class: String,
    pub bbox: BoundingBox,
    pub score: f64,
}

impl CsvRow for ObjectRow {
    const HEADER: &'static [&'static str] = &[
        "video", "frame", "sid", "class", "top", "bottom", "left", "right", "score",
    ];

    fn fields(&self) -> Vec<String> {
        let mut fields = vec![
            self.video.clone(),
            self.frame.to_string(),
            self.sid.to_string(),
            self.class.clone(),
        ];
        fields.extend(box_fields(&self.bbox));
        fields.push(float(self.score));
        fields
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ChapterRow {
    pub video: String,
    pub chapter: usize,
    pub start: f64,
    pub end: f64,
}

impl CsvRow for ChapterRow {
    const HEADER: &'static [&'static str] = &["video", "chapter", "start", "end"];

    fn fields(&self) -> Vec<String> {
        vec![
            self.video.clone(),
            self.chapter.to_string(),
            float(self.start),
            float(self.end),
        ]
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TitleRow {
    pub video: String,
    pub start: f64,
    pub end: f64,
    pub text: String,
}

impl CsvRow for TitleRow {
    const HEADER: &'static [&'static str] = &["video", "start", "end", "text"];

    fn fields(&self) -> Vec<String> {
        vec![
            self.video.clone(),
            float(self.start),
            float(self.end),
            self.text.clone(),
        ]
    }
}

fn escape(field: &str) -> String {
    if field.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", field.replace('"', "\"\""))
    } else {
        field.to_owned()
    }
}

pub fn write_rows<W: Write, R: CsvRow>(mut writer: W, rows: &[R]) -> io::Result<()> {
    writeln!(writer, "{}", R::HEADER.join(","))?;
    for row in rows {
        let line = row.fields().iter().map(|f| escape(f)).collect::<Vec<_>>().join(",");
        writeln!(writer, "{line}")?;
    }
    writer.flush()
}

pub fn write_csv<R: CsvRow>(path: &Path, rows: &[R]) -> io::Result<()> {
    let file = File::create(path)?;
    write_rows(BufWriter::new(file), rows)
}

/// The five tables produced for one episode.
#[derive(Debug, Clone, PartialEq)]
pub struct EpisodeTables {
    pub video: Vec<VideoRow>,
    pub frames: Vec<FrameRow>,
    pub shots: Vec<ShotRow>,
    pub faces: Vec<FaceRow>,
    pub objects: Vec<ObjectRow>,
}

impl EpisodeTables {
    /// Writes `<episode>-{video,frame,shots,faces,yolos}.csv` into `dir` and
    /// returns the paths in that order.
    pub fn write(&self, dir: &Path, episode: &str) -> io::Result<Vec<PathBuf>> {
        fs::create_dir_all(dir)?;
        let path = |suffix: &str| dir.join(format!("{episode}-{suffix}.csv"));

        let paths = vec![
            path("video"),
            path("frame"),
            path("shots"),
            path("faces"),
            path("yolos"),
        ];
        write_csv(&paths[0], &self.video)?;
        write_csv(&paths[1], &self.frames)?;
        write_csv(&paths[2], &self.shots)?;
        write_csv(&paths[3], &self.faces)?;
        write_csv(&paths[4], &self.objects)?;
        Ok(paths)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn render<R: CsvRow>(rows: &[R]) -> String {
        let mut out = Vec::new();
        write_rows(&mut out, rows).unwrap();
        String::from_utf8(out).unwrap()
    }

    #[test]
    fn face_rows_expand_the_box() {
        let rows = [FaceRow {
            video: "bw-s01-e01".into(),
            frame: 12,
            sid: 1,
            character: "sam".into(),
            bbox: BoundingBox { top: 1, bottom: 2, left: 3, right: 4 },
            score: 0.5,
            overlap: 0.25,
        }];
        assert_eq!(
            render(&rows),
            "video,frame,sid,character,top,bottom,left,right,score,overlap\n\
             bw-s01-e01,12,1,sam,1,2,3,4,0.5,0.25\n"
        );
    }

    #[test]
    fn empty_table_still_has_header() {
        let rows: [ObjectRow; 0] = [];
        assert_eq!(render(&rows), "video,frame,sid,class,top,bottom,left,right,score\n");
    }

    #[test]
    fn text_fields_are_quoted() {
        let rows = [TitleRow {
            video: "bw-s01-e01.mp4".into(),
            start: 1.5,
            end: 2.0,
            text: "Well, \"Samantha\"".into(),
        }];
        assert_eq!(
            render(&rows),
            "video,start,end,text\nbw-s01-e01.mp4,1.5,2.0,\"Well, \"\"Samantha\"\"\"\n"
        );
    }

    #[test]
    fn whole_floats_keep_their_fraction() {
        let rows = [FrameRow {
            video: "bw-s01-e01".into(),
            frame: 7,
            sid: 0,
            dval: 13.0,
            hval: 4001.0,
        }];
        assert_eq!(
            render(&rows),
            "video,frame,sid,dval,hval\nbw-s01-e01,7,0,13.0,4001.0\n"
        );
    }

    #[test]
    fn writes_episode_files() {
        let dir = tempfile::tempdir().unwrap();
        let tables = EpisodeTables {
            video: vec![VideoRow {
                video: "bw-s01-e01".into(),
                fps: 29.97,
                frames: 100,
                width: 720,
                height: 480,
            }],
            frames: vec![],
            shots: vec![],
            faces: vec![],
            objects: vec![],
        };
        let paths = tables.write(dir.path(), "bw-s01-e01").unwrap();
        assert!(paths[4].ends_with("bw-s01-e01-yolos.csv"));
        let video = fs::read_to_string(&paths[0]).unwrap();
        assert_eq!(video, "video,fps,frames,width,height\nbw-s01-e01,29.97,100,720,480\n");
    }
}
