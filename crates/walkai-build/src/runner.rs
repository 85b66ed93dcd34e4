//! 外部プロセス実行
//!
//! `pack` や `docker`/`podman` の呼び出しは [`CommandRunner`] を経由します。
//! テストでは記録用のフェイクに差し替えて、実プロセスを起動せずに検証できます。

use std::fmt;
use std::io::Write;
use std::process::{Command, Stdio};

/// 実行するコマンド（プログラム名・引数・標準入力）
#[derive(Clone, PartialEq, Eq)]
pub struct Invocation {
    program: String,
    args: Vec<String>,
    stdin: Option<String>,
}

impl Invocation {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            stdin: None,
        }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    /// 標準入力に流し込む内容（パスワード等はここで渡す）
    pub fn stdin(mut self, input: impl Into<String>) -> Self {
        self.stdin = Some(input.into());
        self
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    pub fn arguments(&self) -> &[String] {
        &self.args
    }

    pub fn stdin_input(&self) -> Option<&str> {
        self.stdin.as_deref()
    }
}

/// ログ出力用。標準入力の内容は含めない
impl fmt::Display for Invocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.program)?;
        for arg in &self.args {
            write!(f, " {}", arg)?;
        }
        Ok(())
    }
}

impl fmt::Debug for Invocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Invocation")
            .field("program", &self.program)
            .field("args", &self.args)
            .field("stdin", &self.stdin.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

/// 終了ステータス（シグナル終了時は `code` が `None`）
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CommandStatus {
    code: Option<i32>,
}

impl CommandStatus {
    pub fn from_code(code: i32) -> Self {
        Self { code: Some(code) }
    }

    pub fn signaled() -> Self {
        Self { code: None }
    }

    pub fn success(&self) -> bool {
        self.code == Some(0)
    }

    pub fn code(&self) -> Option<i32> {
        self.code
    }
}

/// 外部コマンドを同期的に実行する
///
/// 実行ファイルが見つからない場合は `ErrorKind::NotFound` の I/O エラーを返すこと。
pub trait CommandRunner {
    fn run(&self, invocation: &Invocation) -> std::io::Result<CommandStatus>;
}

impl<R: CommandRunner + ?Sized> CommandRunner for &R {
    fn run(&self, invocation: &Invocation) -> std::io::Result<CommandStatus> {
        (**self).run(invocation)
    }
}

/// `std::process::Command` による実装
///
/// 標準出力・標準エラーは親プロセスに継承し、ビルドログをそのまま表示します。
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemRunner;

impl CommandRunner for SystemRunner {
    fn run(&self, invocation: &Invocation) -> std::io::Result<CommandStatus> {
        let mut cmd = Command::new(invocation.program());
        cmd.args(invocation.arguments());
        if invocation.stdin_input().is_some() {
            cmd.stdin(Stdio::piped());
        }

        let mut child = cmd.spawn()?;

        // 書き込みに失敗しても子プロセスは必ず回収する
        let mut written = Ok(());
        if let Some(input) = invocation.stdin_input()
            && let Some(mut stdin) = child.stdin.take()
        {
            written = stdin.write_all(input.as_bytes());
            // stdin を drop して EOF を送る
        }

        let status = child.wait()?;
        // 先に終了したプロセスの終了コードを優先
        if status.success() {
            written?;
        }
        Ok(CommandStatus { code: status.code() })
    }
}
