use crate::scan::streaming::chunk::Chunk;
use pipal::PalindromeRecord;
use std::{io, path::PathBuf};
use tokio::{
    fs::{self, File},
    io::{AsyncWriteExt, BufWriter},
};

/// Destination for the records of each scanned chunk.
pub trait RecordSink: Send + Sync + 'static {
    /// Stores all records of `chunk`, replacing anything stored for it
    /// before. Called once per successfully scanned chunk, even when there
    /// are no records.
    fn write_chunk(
        &self,
        chunk: &Chunk,
        records: &[PalindromeRecord],
    ) -> impl Future<Output = io::Result<()>> + Send;
}

/// Writes each chunk to `<dir>/batch-<chunk id>.txt`, one record per line.
#[derive(Debug, Clone)]
pub struct FileSink {
    dir: PathBuf,
}

impl FileSink {
    /// Creates `dir` if it does not exist.
    pub async fn create(dir: impl Into<PathBuf>) -> io::Result<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir).await?;
        Ok(Self { dir })
    }

    pub fn path_for(&self, chunk: &Chunk) -> PathBuf {
        self.dir.join(format!("batch-{}.txt", chunk.id))
    }
}

impl RecordSink for FileSink {
    async fn write_chunk(&self, chunk: &Chunk, records: &[PalindromeRecord]) -> io::Result<()> {
        let file = File::create(self.path_for(chunk)).await?;
        let mut out = BufWriter::new(file);
        for record in records {
            out.write_all(format!("{record}\n").as_bytes()).await?;
        }
        out.flush().await?;
        out.into_inner().sync_all().await
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn writes_one_line_per_record() {
        let dir = std::env::temp_dir().join(format!("pipal-sink-{}", std::process::id()));
        let sink = FileSink::create(&dir).await.unwrap();
        let chunk = Chunk {
            id: 1_000,
            start: 980,
            length: 100,
            overlap: 20,
            last: false,
        };
        let records = [
            PalindromeRecord {
                chunk_start: 980,
                center: 1_010,
                text: "12345678987654321".to_string(),
                length: 17,
            },
            PalindromeRecord {
                chunk_start: 980,
                center: 1_050,
                text: "9876543210123456789".to_string(),
                length: 19,
            },
        ];

        sink.write_chunk(&chunk, &records).await.unwrap();
        let text = fs::read_to_string(dir.join("batch-1000.txt")).await.unwrap();
        assert_eq!(
            text,
            "980, 1010, 12345678987654321, 17\n980, 1050, 9876543210123456789, 19\n"
        );

        // Rewriting truncates.
        sink.write_chunk(&chunk, &[]).await.unwrap();
        let text = fs::read_to_string(sink.path_for(&chunk)).await.unwrap();
        assert!(text.is_empty());

        fs::remove_dir_all(&dir).await.unwrap();
    }
}
