use tilgen_types::Message;

const ROLE_DESCRIPTION: &str = "\
당신은 20년 이상의 경력을 가진 시니어 개발자입니다.
사용자가 제공한 학습 노트를 기반으로 **최적화된 Markdown 형식의 TIL**을 작성하는 역할을 합니다.";

const RESPONSE_STYLE: &str = "\
- **전문적이면서도 이해하기 쉽게 작성하세요.**
- **Markdown 형식을 엄격하게 준수하세요.**
- **사용자의 원래 표현을 살리되, 가독성을 높이도록 개선하세요.**
- **불필요한 내용을 제거하고, 핵심 내용을 강조하세요.**";

const RULES: &str = "\
- 📌 **반드시 아래 형식의 Markdown으로 작성할 것**:
## 날짜: YYYY-MM-DD
- **사용자에게 입력받은 날짜 및 요일을 넣되, (월)처럼 괄호와 요일 사이에 공백을 두지 마세요.**

### 📌 스크럼
- 학습 목표 1: (내용)
- 학습 목표 2: (내용)
- 학습 목표 3: (내용)

### 📖 새로 배운 내용

#### 주제 1: (주제 설명)
📌 (핵심 요약)
- (세부 내용 1)
- (세부 내용 2)

#### 주제 2: (주제 설명)
📌 (핵심 요약)
- (세부 내용 1)
- (세부 내용 2)

### 🎯 오늘의 도전 과제와 해결 방법
- **도전 과제 1**: (설명 및 해결 방법)
- **도전 과제 2**: (설명 및 해결 방법)

### 📝 오늘의 회고
- (학습 경험에 대한 회고)

### 🔗 참고 자료 및 링크
- [링크 제목](URL)

- **Markdown 개행(`\"  \\n\"`)을 지켜야 합니다.**
- **이전 대화를 참고하여 중복을 줄이고 부족한 내용을 보완하세요.**
- **학습 목표와 해결 방법을 명확하게 정리하세요.**
- **유용한 추가 정보를 제공하세요.**";

const INSTRUCTIONS: &str = "\
아래 사용자의 학습 노트를 기반으로 위의 역할, 응답 스타일, 규칙을 준수하여 최적의 TIL을 작성하세요.";

/// The fixed system segments placed ahead of every conversation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PromptBlocks {
    pub role_description: String,
    pub response_style: String,
    pub rules: String,
    pub instructions: String,
}

impl Default for PromptBlocks {
    fn default() -> Self {
        Self {
            role_description: ROLE_DESCRIPTION.to_string(),
            response_style: RESPONSE_STYLE.to_string(),
            rules: RULES.to_string(),
            instructions: INSTRUCTIONS.to_string(),
        }
    }
}

impl PromptBlocks {
    /// Blocks in prompt order: role, style, rules, instructions
    pub fn ordered(&self) -> [&str; 4] {
        [
            self.role_description.as_str(),
            self.response_style.as_str(),
            self.rules.as_str(),
            self.instructions.as_str(),
        ]
    }
}

/// Prepends the system blocks to a trimmed history
#[derive(Debug, Clone, Default)]
pub struct PromptAssembler {
    blocks: PromptBlocks,
}

impl PromptAssembler {
    pub fn new(blocks: PromptBlocks) -> Self {
        Self { blocks }
    }

    pub fn blocks(&self) -> &PromptBlocks {
        &self.blocks
    }

    pub fn assemble(&self, trimmed: &[Message]) -> Vec<Message> {
        self.blocks
            .ordered()
            .into_iter()
            .filter(|block| !block.trim().is_empty())
            .map(Message::system)
            .chain(trimmed.iter().cloned())
            .collect()
    }
}
