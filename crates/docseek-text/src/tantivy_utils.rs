use tantivy::schema::{Field, IndexRecordOption, Schema, TextFieldIndexing, TextOptions, FAST, STORED};
use tantivy::tokenizer::{LowerCaser, TextAnalyzer, Token, TokenStream, Tokenizer};
use tantivy::Index;

pub const TOKENIZER_NAME: &str = "whitespace_lower";

pub struct ChunkFields {
    pub ord: Field,
    pub text: Field,
}

/// `ord` holds the chunk position, `text` its whitespace-tokenized content.
pub fn build_schema() -> (Schema, ChunkFields) {
    let mut schema_builder = Schema::builder();
    let ord = schema_builder.add_u64_field("ord", STORED | FAST);
    let text_field_indexing = TextFieldIndexing::default()
        .set_tokenizer(TOKENIZER_NAME)
        .set_index_option(IndexRecordOption::WithFreqs);
    let text_options = TextOptions::default().set_indexing_options(text_field_indexing);
    let text = schema_builder.add_text_field("text", text_options);
    (schema_builder.build(), ChunkFields { ord, text })
}

/// Splits on every Unicode whitespace character (`char::is_whitespace`),
/// including NBSP and ideographic space. Punctuation stays in the token.
#[derive(Clone, Default)]
pub struct UnicodeWhitespaceTokenizer {
    token: Token,
}

pub struct UnicodeWhitespaceTokenStream<'a> {
    text: &'a str,
    chars: std::str::CharIndices<'a>,
    token: &'a mut Token,
}

impl Tokenizer for UnicodeWhitespaceTokenizer {
    type TokenStream<'a> = UnicodeWhitespaceTokenStream<'a>;

    fn token_stream<'a>(&'a mut self, text: &'a str) -> Self::TokenStream<'a> {
        self.token.reset();
        UnicodeWhitespaceTokenStream { text, chars: text.char_indices(), token: &mut self.token }
    }
}

impl TokenStream for UnicodeWhitespaceTokenStream<'_> {
    fn advance(&mut self) -> bool {
        let Some((start, _)) = self.chars.find(|(_, c)| !c.is_whitespace()) else {
            return false;
        };
        let end = self.chars.find(|(_, c)| c.is_whitespace()).map_or(self.text.len(), |(i, _)| i);
        self.token.text.clear();
        self.token.text.push_str(&self.text[start..end]);
        self.token.offset_from = start;
        self.token.offset_to = end;
        self.token.position = self.token.position.wrapping_add(1);
        true
    }

    fn token(&self) -> &Token { self.token }

    fn token_mut(&mut self) -> &mut Token { self.token }
}

fn analyzer() -> TextAnalyzer {
    TextAnalyzer::builder(UnicodeWhitespaceTokenizer::default())
        .filter(LowerCaser)
        .build()
}

/// Lower-cased whitespace tokens for indexed chunk text.
pub fn register_tokenizer(index: &Index) {
    index.tokenizers().register(TOKENIZER_NAME, analyzer());
}

/// Runs the query through the same analyzer as the indexed text.
pub fn tokenize_query(query: &str) -> Vec<String> {
    let mut analyzer = analyzer();
    let mut stream = analyzer.token_stream(query);
    let mut tokens = Vec::new();
    stream.process(&mut |token: &Token| tokens.push(token.text.clone()));
    tokens
}
