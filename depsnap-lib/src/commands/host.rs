use std::io::Write;

/// Where command output goes, so commands can run against in-memory buffers
pub trait Host: Send + Sync {
    // normal output, such as generated JSON
    fn output(&mut self) -> impl Write;

    // diagnostics meant for the user
    fn error(&mut self) -> impl Write;

    /// Terminate the process. A test host may just record the code.
    fn exit(&mut self, code: i32);
}

/// Captures output in memory
#[cfg(test)]
pub struct TestHost {
    pub output_buf: Vec<u8>,
    pub error_buf: Vec<u8>,
    pub exit_code: Option<i32>,
}

#[cfg(test)]
impl TestHost {
    pub const fn new() -> Self {
        Self {
            output_buf: Vec::new(),
            error_buf: Vec::new(),
            exit_code: None,
        }
    }

    pub fn output_text(&self) -> String {
        String::from_utf8_lossy(&self.output_buf).into_owned()
    }
}

#[cfg(test)]
impl Host for TestHost {
    fn output(&mut self) -> impl Write {
        &mut self.output_buf
    }

    fn error(&mut self) -> impl Write {
        &mut self.error_buf
    }

    fn exit(&mut self, code: i32) {
        self.exit_code = Some(code);
    }
}
