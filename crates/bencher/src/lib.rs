#[derive(Debug, Copy, Clone)]
pub struct TestCase {
    name: &'static str,
    group: TestGroup,
    file: TestFile,
}

impl TestCase {
    pub fn new(name: &'static str, group: TestGroup, file: TestFile) -> Self {
        Self { name, group, file }
    }

    pub fn small(name: &'static str, file: TestFile) -> Self {
        Self::new(name, TestGroup::Small, file)
    }

    pub fn normal(name: &'static str, file: TestFile) -> Self {
        Self::new(name, TestGroup::Normal, file)
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn group(&self) -> TestGroup {
        self.group
    }

    pub fn file(&self) -> &TestFile {
        &self.file
    }

    pub fn file_name(&self) -> &'static str {
        self.file().file_name
    }
}

/// A request body fixture and the content-type it is sent with.
#[derive(Debug, Copy, Clone)]
pub struct TestFile {
    file_name: &'static str,
    content_type: &'static str,
    content: &'static [u8],
}

impl TestFile {
    pub const fn new(file_name: &'static str, content_type: &'static str, content: &'static [u8]) -> Self {
        Self { file_name, content_type, content }
    }

    pub fn content(&self) -> &'static [u8] {
        self.content
    }

    pub fn content_type(&self) -> &'static str {
        self.content_type
    }

    pub fn file_name(&self) -> &'static str {
        self.file_name
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TestGroup {
    Small,
    Normal,
}

impl TestGroup {
    pub const ALL: [TestGroup; 2] = [TestGroup::Small, TestGroup::Normal];

    pub fn name(&self) -> &'static str {
        match self {
            TestGroup::Small => "small",
            TestGroup::Normal => "normal",
        }
    }
}
