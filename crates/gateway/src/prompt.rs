//! Fashion-fortune prompt construction.
//!
//! The prompt asks for an HTML fragment: two collapsed `<details>` blocks
//! (reading and lucky colour) followed by two visible `<h3>` sections
//! (outfit and mindset). The caller injects the fragment into the page
//! as-is.

use std::fmt;

use {
    chrono::{FixedOffset, NaiveDate, Utc},
    serde::Deserialize,
};

/// Stand-in for an omitted or blank birth time.
pub const UNKNOWN_TIME: &str = "unknown";

/// Korea Standard Time, the calendar the readings are written against.
const KST_OFFSET_SECS: i32 = 9 * 3600;

/// A date component as sent by the front end: `"1990"` or `1990`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum DatePart {
    Number(i64),
    Text(String),
}

impl DatePart {
    fn normalized(&self) -> Option<String> {
        match self {
            Self::Number(n) => Some(n.to_string()),
            Self::Text(s) => {
                let s = s.trim();
                (!s.is_empty()).then(|| s.to_string())
            },
        }
    }
}

impl From<i64> for DatePart {
    fn from(n: i64) -> Self {
        Self::Number(n)
    }
}

impl From<&str> for DatePart {
    fn from(s: &str) -> Self {
        Self::Text(s.to_string())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("missing or blank birth field: {0}")]
pub struct MissingField(pub &'static str);

/// Birth date and optional hour, normalized to display strings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BirthInfo {
    pub year: String,
    pub month: String,
    pub day: String,
    pub time: String,
}

impl BirthInfo {
    pub fn new(
        year: &DatePart,
        month: &DatePart,
        day: &DatePart,
        time: Option<&str>,
    ) -> Result<Self, MissingField> {
        let time = time
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .unwrap_or(UNKNOWN_TIME);
        Ok(Self {
            year: year.normalized().ok_or(MissingField("year"))?,
            month: month.normalized().ok_or(MissingField("month"))?,
            day: day.normalized().ok_or(MissingField("day"))?,
            time: time.to_string(),
        })
    }

    /// The birth line as it appears in the prompt.
    #[must_use]
    pub fn render(&self, language: Language) -> String {
        let Self {
            year,
            month,
            day,
            time,
        } = self;
        match language {
            Language::Ko => format!("{year}년 {month}월 {day}일 {time}"),
            Language::En => format!("{year}-{month}-{day} {time}"),
            Language::Ja | Language::Zh => format!("{year}年{month}月{day}日 {time}"),
        }
    }
}

/// Output language of the reading.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Language {
    #[default]
    Ko,
    En,
    Ja,
    Zh,
}

impl Language {
    /// Parse a language tag such as `en` or `zh-TW`. Anything unrecognised
    /// falls back to Korean.
    #[must_use]
    pub fn from_code(code: &str) -> Self {
        let primary = code
            .trim()
            .split(['-', '_'])
            .next()
            .unwrap_or_default()
            .to_ascii_lowercase();
        match primary.as_str() {
            "en" => Self::En,
            "ja" | "jp" => Self::Ja,
            "zh" | "cn" => Self::Zh,
            _ => Self::Ko,
        }
    }

    #[must_use]
    pub fn code(self) -> &'static str {
        match self {
            Self::Ko => "ko",
            Self::En => "en",
            Self::Ja => "ja",
            Self::Zh => "zh",
        }
    }

    /// Shown in place of a reading when every attempt failed.
    #[must_use]
    pub fn apology(self) -> &'static str {
        match self {
            Self::Ko => {
                "<p>지금은 운세를 불러올 수 없습니다. 잠시 후 다시 시도해 주세요.</p>"
            },
            Self::En => "<p>We couldn't read your fortune right now. Please try again shortly.</p>",
            Self::Ja => "<p>ただいま運勢を読み込めません。しばらくしてから再度お試しください。</p>",
            Self::Zh => "<p>暂时无法获取您的运势，请稍后再试。</p>",
        }
    }

    fn format_date(self, date: NaiveDate) -> String {
        let pattern = match self {
            Self::Ko => "%Y년 %-m월 %-d일",
            Self::En => "%B %-d, %Y",
            Self::Ja | Self::Zh => "%Y年%-m月%-d日",
        };
        date.format(pattern).to_string()
    }

    fn template(self) -> &'static Template {
        match self {
            Self::Ko => &KO,
            Self::En => &EN,
            Self::Ja => &JA,
            Self::Zh => &ZH,
        }
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// Reply for requests whose body could not be understood; the language is
/// unknown at that point so both Korean and English are given.
pub const INVALID_REQUEST_MESSAGE: &str =
    "<p>생년월일을 다시 확인해 주세요. Please check your date of birth.</p>";

/// Today's date in Korea.
#[must_use]
pub fn today_kst() -> NaiveDate {
    let now = Utc::now();
    FixedOffset::east_opt(KST_OFFSET_SECS)
        .map_or_else(|| now.date_naive(), |kst| now.with_timezone(&kst).date_naive())
}

/// Build the generation prompt for one reading.
#[must_use]
pub fn build_prompt(info: &BirthInfo, language: Language, today: NaiveDate) -> String {
    let t = language.template();
    let birth = info.render(language);
    let today = language.format_date(today);
    let view = t.view;

    let mut out = String::with_capacity(1024);
    out.push_str(t.persona);
    out.push('\n');
    out.push_str(&format!("{}: {birth}\n", t.birth_label));
    out.push_str(&format!("{}: {today}\n\n", t.today_label));

    out.push_str(&format!("[{}]\n", t.guide_heading));
    for (n, line) in t.guide.iter().enumerate() {
        out.push_str(&format!("{}. {line}\n", n + 1));
    }
    out.push('\n');

    out.push_str(&format!("[{}]\n", t.example_heading));
    for (emoji, title) in [("🔍", t.analysis), ("🎨", t.color)] {
        out.push_str(&format!(
            "<details>\n    <summary>{emoji} {title} [{view}]</summary>\n    <p>...</p>\n</details>\n"
        ));
    }
    for (emoji, title) in [("👕", t.outfit), ("🍀", t.mindset)] {
        out.push_str(&format!("<h3>{emoji} {title}</h3>\n<p>...</p>\n"));
    }
    out
}

struct Template {
    persona: &'static str,
    birth_label: &'static str,
    today_label: &'static str,
    guide_heading: &'static str,
    guide: [&'static str; 5],
    example_heading: &'static str,
    analysis: &'static str,
    color: &'static str,
    outfit: &'static str,
    mindset: &'static str,
    view: &'static str,
}

static KO: Template = Template {
    persona: "당신은 트렌디한 'AI 사주 패션 디렉터'입니다.",
    birth_label: "사용자 생년월일시",
    today_label: "오늘 날짜",
    guide_heading: "출력 가이드",
    guide: [
        "반드시 HTML 태그만 사용하고 마크다운은 쓰지 마세요.",
        "'오늘의 사주 분석'과 '오늘의 행운 컬러'는 <details><summary>... [보기]</summary></details> 태그로 감싸서 기본적으로 접어두세요.",
        "'오늘의 추천 코디'와 '오늘의 마음가짐'은 <h3> 태그를 사용하여 바로 보이게 하세요.",
        "출생 시간이 unknown이면 시주를 제외하고 해석하세요.",
        "전체적인 문체는 우아하고 차분하게, 한국어로 작성하세요.",
    ],
    example_heading: "작성 예시",
    analysis: "오늘의 사주 분석",
    color: "오늘의 행운 컬러",
    outfit: "오늘의 추천 코디",
    mindset: "오늘의 마음가짐",
    view: "보기",
};

static EN: Template = Template {
    persona: "You are a trendy 'AI Saju Fashion Director' who reads the Four Pillars of Destiny.",
    birth_label: "User's date and time of birth",
    today_label: "Today's date",
    guide_heading: "Output guide",
    guide: [
        "Use HTML tags only, never Markdown.",
        "Wrap 'Today's Saju Reading' and 'Today's Lucky Colour' in <details><summary>... [View]</summary></details> so they start collapsed.",
        "Show 'Today's Outfit' and 'Today's Mindset' directly under <h3> headings.",
        "If the birth time is unknown, leave out the hour pillar.",
        "Write in English with an elegant, calm tone.",
    ],
    example_heading: "Example",
    analysis: "Today's Saju Reading",
    color: "Today's Lucky Colour",
    outfit: "Today's Outfit",
    mindset: "Today's Mindset",
    view: "View",
};

static JA: Template = Template {
    persona: "あなたはトレンドに敏感な「AI四柱推命ファッションディレクター」です。",
    birth_label: "ユーザーの生年月日時",
    today_label: "今日の日付",
    guide_heading: "出力ガイド",
    guide: [
        "必ずHTMLタグのみを使い、Markdownは使わないでください。",
        "「今日の四柱推命分析」と「今日のラッキーカラー」は<details><summary>... [表示]</summary></details>で囲み、折りたたんでください。",
        "「今日のおすすめコーデ」と「今日の心構え」は<h3>タグですぐ見えるようにしてください。",
        "出生時刻がunknownの場合は時柱を除いて解釈してください。",
        "全体を上品で落ち着いた日本語で書いてください。",
    ],
    example_heading: "記述例",
    analysis: "今日の四柱推命分析",
    color: "今日のラッキーカラー",
    outfit: "今日のおすすめコーデ",
    mindset: "今日の心構え",
    view: "表示",
};

static ZH: Template = Template {
    persona: "你是一位时尚的“AI八字穿搭顾问”。",
    birth_label: "用户出生日期与时间",
    today_label: "今天日期",
    guide_heading: "输出指南",
    guide: [
        "只使用HTML标签，不要使用Markdown。",
        "“今日八字分析”和“今日幸运色”请用<details><summary>... [查看]</summary></details>包裹并默认折叠。",
        "“今日推荐穿搭”和“今日心态”请用<h3>标签直接显示。",
        "如果出生时间为unknown，请不考虑时柱进行解读。",
        "请用优雅、平静的简体中文书写。",
    ],
    example_heading: "示例",
    analysis: "今日八字分析",
    color: "今日幸运色",
    outfit: "今日推荐穿搭",
    mindset: "今日心态",
    view: "查看",
};

#[cfg(test)]
mod tests {
    use {super::*, rstest::rstest};

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn num(n: i64) -> DatePart {
        DatePart::Number(n)
    }

    fn text(s: &str) -> DatePart {
        DatePart::from(s)
    }

    #[test]
    fn omitted_time_uses_unknown_marker() {
        let info = BirthInfo::new(&num(1990), &num(5), &num(14), None).unwrap();
        assert_eq!(info.time, UNKNOWN_TIME);

        let prompt = build_prompt(&info, Language::Ko, date(2026, 2, 8));
        assert!(!prompt.is_empty());
        assert!(prompt.contains("1990년 5월 14일 unknown"));
        assert!(prompt.contains("2026년 2월 8일"));
    }

    #[test]
    fn blank_time_is_treated_as_omitted() {
        let info = BirthInfo::new(&text("1990"), &text("5"), &text("14"), Some("  ")).unwrap();
        assert_eq!(info.time, UNKNOWN_TIME);
    }

    #[test]
    fn string_and_number_parts_render_alike() {
        let a = BirthInfo::new(&text("1990"), &text("05"), &num(14), Some("오시")).unwrap();
        assert_eq!(a.render(Language::Ko), "1990년 05월 14일 오시");
    }

    #[test]
    fn blank_date_part_is_rejected() {
        let err = BirthInfo::new(&num(1990), &text(" "), &num(14), None).unwrap_err();
        assert_eq!(err, MissingField("month"));
    }

    #[rstest]
    #[case("ko", Language::Ko)]
    #[case("en", Language::En)]
    #[case("EN-us", Language::En)]
    #[case("ja", Language::Ja)]
    #[case("zh_TW", Language::Zh)]
    #[case("fr", Language::Ko)]
    #[case("", Language::Ko)]
    fn language_codes(#[case] code: &str, #[case] expected: Language) {
        assert_eq!(Language::from_code(code), expected);
    }

    #[rstest]
    #[case(Language::Ko, "오늘의 추천 코디", "2026년 2월 8일")]
    #[case(Language::En, "Today's Outfit", "February 8, 2026")]
    #[case(Language::Ja, "今日の心構え", "2026年2月8日")]
    #[case(Language::Zh, "今日幸运色", "2026年2月8日")]
    fn prompt_is_localized(#[case] language: Language, #[case] section: &str, #[case] day: &str) {
        let info = BirthInfo::new(&num(1990), &num(5), &num(14), Some("12:30")).unwrap();
        let prompt = build_prompt(&info, language, date(2026, 2, 8));
        assert!(prompt.contains(section));
        assert!(prompt.contains(day));
        assert!(prompt.contains("<details>"));
        assert!(prompt.contains("<h3>"));
        assert!(prompt.contains("12:30"));
    }

    #[test]
    fn every_language_has_an_apology_paragraph() {
        for language in [Language::Ko, Language::En, Language::Ja, Language::Zh] {
            let msg = language.apology();
            assert!(msg.starts_with("<p>") && msg.ends_with("</p>"));
        }
    }

    #[test]
    fn date_part_deserializes_from_string_or_number() {
        let parts: Vec<DatePart> = serde_json::from_str(r#"[1990, "05"]"#).unwrap();
        assert_eq!(parts, [DatePart::Number(1990), DatePart::Text("05".into())]);
    }
}
