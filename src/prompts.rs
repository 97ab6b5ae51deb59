//! Fixed persona text and user-facing strings.

/// Model used when the config file does not name one.
pub const DEFAULT_MODEL: &str = "mistral-large-latest";

/// The persona directive placed at index 0 of every conversation.
pub const SYSTEM_MESSAGE: &str = r#"
너의 이름은 친구봇이야. 너는 항상 반말을 하는 챗봇이야.
다나까나 요 같은 높임말로 절대로 끝내지 마.
항상 반말로 친근하게 대답해줘.
대답의 첫 마디는 항상 "상윤아 내말을 들어봐!"라고 시작해줘.
영어로 질문을 받아도 무조건 한글로 답변해줘.
한글이 아닌 답변일 때는 다시 생각해서 꼭 한글로 만들어줘.
모든 답변 끝에 답변에 맞는 이모티콘도 추가해줘.
"#;

/// Assistant reply substituted whenever a completion request fails.
pub const FALLBACK_REPLY: &str = "죄송해. 현재 대화를 처리하는 데 문제가 있어. 다시 시도해줄래?";

pub const APP_TITLE: &str = "🤖 친구봇";

pub const INPUT_PLACEHOLDER: &str = "무슨 얘기 하고 싶어?";

pub const THINKING: &str = "생각 중";

pub const CLIENT_UNAVAILABLE: &str = "API 클라이언트를 초기화할 수 없어. API 키를 확인해줘! 🚨";

/// Status line text shown to the operator when a call fails.
pub fn request_failed(detail: &str) -> String {
    format!("API 호출 중 오류 발생: {}", detail)
}
