use std::io::Write;

/// Abstract the process environment so commands can run in-process under test
pub trait Host: Send + Sync {
    // where normal output goes (stdout)
    fn output(&mut self) -> impl Write;

    // where errors and usage messages go (stderr)
    fn error(&mut self) -> impl Write;

    /// Terminate the process with `code`. A test host records the code and returns.
    fn exit(&mut self, code: i32);
}

/// Host that captures output in memory and remembers the requested exit code
#[cfg(test)]
#[derive(Debug, Default)]
pub struct TestHost {
    pub output_buf: Vec<u8>,
    pub error_buf: Vec<u8>,
    pub exit_code: Option<i32>,
}

#[cfg(test)]
impl TestHost {
    pub fn output_str(&self) -> String {
        String::from_utf8_lossy(&self.output_buf).into_owned()
    }

    pub fn error_str(&self) -> String {
        String::from_utf8_lossy(&self.error_buf).into_owned()
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
