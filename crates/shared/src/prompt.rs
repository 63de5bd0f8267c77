use crate::models::Topic;

/// Key under which an override of [`DEFAULT_TEMPLATE`] is looked up.
pub const BLOG_PROMPT_KEY: &str = "blog";

pub const DEFAULT_TEMPLATE: &str = "\
Schrijf een uitgebreid blogartikel in het Nederlands voor een jachtexamen voorbereidingsplatform.

ONDERWERP: {topic}
PRIMAIRE KEYWORD: {primary_keyword}
SECUNDAIRE KEYWORDS: {secondary_keywords}

STRUCTUUR:
1. Pakkende titel (50-60 karakters) met de primaire keyword, als '# ' kop
2. Inleiding van 150-200 woorden over het belang voor het jachtexamen
3. 4-6 hoofdsecties met '## ' koppen, elk met minimaal twee '### ' subsecties
4. Opsommingen of genummerde lijsten waar relevant
5. Praktische voorbeelden en examenvragen
6. Conclusie met een oproep om oefenexamens te maken

SEO:
- Keyword dichtheid van 1-2% voor de primaire keyword
- Secundaire keywords natuurlijk verwerkt
- Een regel 'Meta beschrijving: ...' van 150-160 karakters

TOON:
- Professioneel maar toegankelijk, gericht op examenkandidaten
- Gebruik Nederlandse jachtterminologie

Schrijf minimaal 800 woorden, verdeeld over alinea's gescheiden door lege regels.

Begin nu met het schrijven van het artikel:
";

const META_TEMPLATE: &str = "\
Schrijf een SEO-geoptimaliseerde meta beschrijving voor dit jachtexamen blog artikel:

TITEL: {title}
PRIMAIRE KEYWORD: {primary_keyword}

Vereisten:
- Maximaal 160 karakters
- Bevat de primaire keyword
- Nederlandse taal

Geef alleen de meta beschrijving terug, geen extra tekst.
";

const EXAM_QUESTIONS_TEMPLATE: &str = "\
Genereer 3-5 examenvragen gebaseerd op dit blog artikel:

HOOFDONDERWERP: {title}
ARTIKEL: {content}

Voor elke vraag:
1. Multiple choice vraag met precies 4 antwoordopties
2. Index (vanaf 0) van het juiste antwoord
3. Korte uitleg bij het juiste antwoord
4. Moeilijkheidsgraad (makkelijk/gemiddeld/moeilijk)

Geef alleen een JSON array terug:
[
  {
    \"question\": \"Wat is de minimale leeftijd voor het jachtexamen?\",
    \"options\": [\"16 jaar\", \"18 jaar\", \"21 jaar\", \"25 jaar\"],
    \"correct_answer\": 1,
    \"explanation\": \"In Nederland moet je minimaal 18 jaar zijn om het jachtexamen af te leggen.\",
    \"difficulty\": \"makkelijk\"
  }
]
";

/// Words of article text passed along with the exam question request.
pub const EXAM_CONTEXT_WORDS: usize = 500;

/// A filled-in generation prompt and the keywords it targets.
#[derive(Debug, Clone, PartialEq)]
pub struct Prompt {
    pub text: String,
    pub primary_keyword: String,
    pub secondary_keywords: Vec<String>,
}

/// Fill `template` from `topic`. Pure: the same inputs give the same prompt.
pub fn build_prompt(template: &str, topic: &Topic) -> Prompt {
    let primary_keyword = topic.primary_keyword();
    let secondary_keywords = topic.secondary_keywords().to_vec();

    let text = template
        .replace("{topic}", &topic.title)
        .replace("{primary_keyword}", &primary_keyword)
        .replace("{secondary_keywords}", &secondary_keywords.join(", "));

    Prompt {
        text,
        primary_keyword,
        secondary_keywords,
    }
}

pub fn meta_description_prompt(title: &str, primary_keyword: &str) -> String {
    META_TEMPLATE
        .replace("{title}", title)
        .replace("{primary_keyword}", primary_keyword)
}

/// `text` is plain article text; only its first [`EXAM_CONTEXT_WORDS`] words are used.
pub fn exam_questions_prompt(title: &str, text: &str) -> String {
    let context = text
        .split_whitespace()
        .take(EXAM_CONTEXT_WORDS)
        .collect::<Vec<_>>()
        .join(" ");
    EXAM_QUESTIONS_TEMPLATE
        .replace("{title}", title)
        .replace("{content}", &context)
}
