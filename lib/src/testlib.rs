//! Common utilities used by the library tests.

use rand::Rng;
use std::{env, fmt, fs, path::PathBuf};

/// A temporary directory that is deleted when the fixture goes out of scope.
#[derive(Debug)]
pub(crate) struct TestFixture(PathBuf);
impl TestFixture {
    /// Creates the test directory or panics if a unique directory cannot be created.
    pub(crate) fn create() -> Self {
        let tmpdir = env::temp_dir();
        // try to get a unique directory name 10 times
        let test_dir = (0..10)
            .map(|_| tmpdir.join(format!("weather_lib-{}", generate_random_string(15))))
            .find(|test_dir| !test_dir.exists());
        match test_dir {
            Some(test_dir) => match fs::create_dir(&test_dir) {
                Ok(_) => Self(test_dir),
                Err(err) => panic!("Error creating '{}': {err}", test_dir.display()),
            },
            None => panic!("Tried 10 times to get a unique test directory name and failed..."),
        }
    }
    /// Get the pathname of a file in the test directory.
    pub(crate) fn file(&self, filename: &str) -> PathBuf {
        self.0.join(filename)
    }
}
impl Drop for TestFixture {
    /// Clean up the temporary directory as best you can.
    fn drop(&mut self) {
        if let Err(err) = fs::remove_dir_all(&self.0) {
            eprintln!("Error cleaning up test directory {self}: {err}");
        }
    }
}
impl fmt::Display for TestFixture {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.display())
    }
}

pub(crate) fn generate_random_string(len: usize) -> String {
    const CHARS: &[u8] = b"abcdefghijklmnopqrstuvwxyz0123456789";
    let mut rng = rand::rng();
    (0..len).map(|_| CHARS[rng.random_range(0..CHARS.len())] as char).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fixture_cleanup() {
        let test_dir = {
            let fixture = TestFixture::create();
            let filename = fixture.file("weather.db");
            fs::write(&filename, "forecast").unwrap();
            assert!(filename.is_file());
            PathBuf::from(fixture.to_string())
        };
        assert!(!test_dir.exists());
        assert_eq!(generate_random_string(12).len(), 12);
    }
}
