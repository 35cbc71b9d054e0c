use rand::seq::SliceRandom;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Phrase {
    pub text: &'static str,
    pub language: &'static str,
}

const fn phrase(text: &'static str, language: &'static str) -> Phrase {
    Phrase { text, language }
}

/// "One more" in many languages; the teaser posted when a single slot is left.
pub const ONE_MORE_PHRASES: &[Phrase] = &[
    phrase("One more", "English"),
    phrase("Uno más", "Spanish"),
    phrase("Un de plus", "French"),
    phrase("Noch einer", "German"),
    phrase("Ancora uno", "Italian"),
    phrase("Mais um", "Portuguese"),
    phrase("Nog één", "Dutch"),
    phrase("En till", "Swedish"),
    phrase("En til", "Norwegian"),
    phrase("Én mere", "Danish"),
    phrase("Eitt enn", "Icelandic"),
    phrase("Yksi lisää", "Finnish"),
    phrase("Üks veel", "Estonian"),
    phrase("Vēl viens", "Latvian"),
    phrase("Dar vienas", "Lithuanian"),
    phrase("Jeszcze jeden", "Polish"),
    phrase("Ještě jeden", "Czech"),
    phrase("Ešte jeden", "Slovak"),
    phrase("Még egy", "Hungarian"),
    phrase("Încă unul", "Romanian"),
    phrase("Още един", "Bulgarian"),
    phrase("Још један", "Serbian"),
    phrase("Još jedan", "Croatian"),
    phrase("Še eden", "Slovenian"),
    phrase("Уште еден", "Macedonian"),
    phrase("Edhe një", "Albanian"),
    phrase("Ένας ακόμα", "Greek"),
    phrase("Ещё один", "Russian"),
    phrase("Ще один", "Ukrainian"),
    phrase("Яшчэ адзін", "Belarusian"),
    phrase("Bir tane daha", "Turkish"),
    phrase("Yana bitta", "Uzbek"),
    phrase("Тағы біреу", "Kazakh"),
    phrase("Дагы бирөө", "Kyrgyz"),
    phrase("Bir dənə də", "Azerbaijani"),
    phrase("Ýene bir", "Turkmen"),
    phrase("Тагын берәү", "Tatar"),
    phrase("Дахиад нэг", "Mongolian"),
    phrase("ԵՒս մեկ", "Armenian"),
    phrase("კიდევ ერთი", "Georgian"),
    phrase("یکی دیگر", "Persian"),
    phrase("یو بل", "Pashto"),
    phrase("Yekî din", "Kurdish"),
    phrase("واحد آخر", "Arabic"),
    phrase("עוד אחד", "Hebrew"),
    phrase("ሌላ አንድ", "Amharic"),
    phrase("Wieħed ieħor", "Maltese"),
    phrase("एक और", "Hindi"),
    phrase("ایک اور", "Urdu"),
    phrase("আরও একটি", "Bengali"),
    phrase("ਇੱਕ ਹੋਰ", "Punjabi"),
    phrase("એક વધુ", "Gujarati"),
    phrase("आणखी एक", "Marathi"),
    phrase("अर्को एक", "Nepali"),
    phrase("இன்னும் ஒன்று", "Tamil"),
    phrase("ఇంకొకటి", "Telugu"),
    phrase("ಇನ್ನೊಂದು", "Kannada"),
    phrase("ഒന്നുകൂടി", "Malayalam"),
    phrase("තව එකක්", "Sinhala"),
    phrase("ଆଉ ଗୋଟିଏ", "Odia"),
    phrase("আৰু এটা", "Assamese"),
    phrase("एकं अधिकम्", "Sanskrit"),
    phrase("再来一个", "Chinese (Simplified)"),
    phrase("再來一個", "Chinese (Traditional)"),
    phrase("再嚟一個", "Cantonese"),
    phrase("もう一人", "Japanese"),
    phrase("한 명 더", "Korean"),
    phrase("Thêm một", "Vietnamese"),
    phrase("อีกหนึ่ง", "Thai"),
    phrase("ອີກໜຶ່ງ", "Lao"),
    phrase("មួយទៀត", "Khmer"),
    phrase("နောက်တစ်ယောက်", "Burmese"),
    phrase("ཡང་གཅིག", "Tibetan"),
    phrase("Satu lagi", "Indonesian"),
    phrase("Satu lagi!", "Malay"),
    phrase("Isa pa", "Filipino"),
    phrase("Siji maneh", "Javanese"),
    phrase("Hiji deui", "Sundanese"),
    phrase("Iray hafa", "Malagasy"),
    phrase("Tahi atu anō", "Māori"),
    phrase("Hoʻokahi hou", "Hawaiian"),
    phrase("Tasi pe", "Samoan"),
    phrase("Moja zaidi", "Swahili"),
    phrase("Ọkan si", "Yoruba"),
    phrase("Otu ọzọ", "Igbo"),
    phrase("Ɗaya kuma", "Hausa"),
    phrase("Kotu kale", "Oromo"),
    phrase("Mid kale", "Somali"),
    phrase("Omunye futhi", "Zulu"),
    phrase("Omnye kwakhona", "Xhosa"),
    phrase("E nngwe hape", "Sesotho"),
    phrase("Imwe zvakare", "Shona"),
    phrase("Kimwe kandi", "Kinyarwanda"),
    phrase("Nog een", "Afrikaans"),
    phrase("Un altru", "Sicilian"),
    phrase("Un autre", "Québécois"),
    phrase("Un més", "Catalan"),
    phrase("Un máis", "Galician"),
    phrase("Bat gehiago", "Basque"),
    phrase("Un ulteriore", "Sardinian"),
    phrase("Ein meh", "Swiss German"),
    phrase("Noch ee", "Luxembourgish"),
    phrase("Noch ein", "Yiddish (romanized)"),
    phrase("Ceann eile", "Irish"),
    phrase("Fear eile", "Scottish Gaelic"),
    phrase("Un arall", "Welsh"),
    phrase("Unan all", "Breton"),
    phrase("Onan moy", "Cornish"),
    phrase("Unu pli", "Esperanto"),
    phrase("Unus plus", "Latin"),
    phrase("Un plus", "Occitan"),
    phrase("Wan moa", "Jamaican Patois"),
    phrase("Wan moa", "Tok Pisin"),
    phrase("Ua dua", "Hmong"),
    phrase("wa' latlh", "Klingon"),
];

pub fn random_one_more() -> Phrase {
    ONE_MORE_PHRASES.choose(&mut rand::thread_rng()).copied().unwrap_or(ONE_MORE_PHRASES[0])
}

#[cfg(test)]
mod tests {
    use super::{random_one_more, ONE_MORE_PHRASES};

    #[test]
    fn phrase_set_is_large_and_non_empty() {
        assert!(ONE_MORE_PHRASES.len() >= 110);
        assert!(ONE_MORE_PHRASES.iter().all(|phrase| !phrase.text.trim().is_empty()));
    }

    #[test]
    fn random_pick_comes_from_the_set() {
        for _ in 0..32 {
            let picked = random_one_more();
            assert!(ONE_MORE_PHRASES.contains(&picked));
        }
    }
}
