//! Line input read off the async runtime.

use std::io::{self, BufRead};
use std::thread;

use tokio::sync::mpsc;
use tracing::debug;

/// Lines buffered between the reader thread and the ingest loop.
const LINE_BUFFER: usize = 1024;

/// Read `reader` line by line on a dedicated thread and forward each line.
///
/// The thread owns the blocking reads, so the receiving task can stop
/// listening at any time. The channel closes after EOF or the first read
/// error, which is forwarded before closing.
pub fn spawn_line_reader<R>(reader: R) -> io::Result<mpsc::Receiver<io::Result<String>>>
where
    R: BufRead + Send + 'static,
{
    let (tx, rx) = mpsc::channel(LINE_BUFFER);
    thread::Builder::new()
        .name("line-reader".to_string())
        .spawn(move || {
            for line in reader.lines() {
                let failed = line.is_err();
                if tx.blocking_send(line).is_err() {
                    debug!("line receiver dropped, reader exiting");
                    return;
                }
                if failed {
                    return;
                }
            }
        })?;
    Ok(rx)
}

#[cfg(test)]
mod tests {
    use std::io::{Cursor, Read};

    use super::*;

    struct Failing;

    impl Read for Failing {
        fn read(&mut self, _buf: &mut [u8]) -> io::Result<usize> {
            Err(io::Error::other("device gone"))
        }
    }

    #[tokio::test]
    async fn forwards_lines_then_closes() {
        let mut rx = spawn_line_reader(Cursor::new("one\ntwo\n")).unwrap();
        assert_eq!(rx.recv().await.unwrap().unwrap(), "one");
        assert_eq!(rx.recv().await.unwrap().unwrap(), "two");
        assert!(rx.recv().await.is_none());
    }

    #[tokio::test]
    async fn read_error_is_forwarded_once() {
        let mut rx = spawn_line_reader(io::BufReader::new(Failing)).unwrap();
        assert!(rx.recv().await.unwrap().is_err());
        assert!(rx.recv().await.is_none());
    }
}
